// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Playback direction and the cursor step rule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn from_backward(backward: bool) -> Self {
        if backward {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    pub fn is_backward(self) -> bool {
        self == Direction::Backward
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

/// Result of one cursor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The cursor moved to this index.
    Moved(usize),
    /// The cursor was already at the boundary and stays at this index.
    Ended(usize),
}

/// Next cursor position for a source of `length` frames.
///
/// Without a cursor the first step anchors at the start (forward) or the
/// last frame (backward). Otherwise the cursor moves one frame and clamps
/// to `[0, length - 1]`; a step that would not change it ends the stream.
/// `length` must be positive.
pub fn advance(cursor: Option<usize>, direction: Direction, length: usize) -> Step {
    let last = length.saturating_sub(1);
    let Some(current) = cursor else {
        return match direction {
            Direction::Forward => Step::Moved(0),
            Direction::Backward => Step::Moved(last),
        };
    };
    let next = match direction {
        Direction::Forward => current.saturating_add(1).min(last),
        Direction::Backward => current.saturating_sub(1).min(last),
    };
    if next == current {
        Step::Ended(current)
    } else {
        Step::Moved(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(direction: Direction, length: usize) -> (Vec<usize>, usize) {
        let mut cursor = None;
        let mut seen = Vec::new();
        loop {
            match advance(cursor, direction, length) {
                Step::Moved(i) => {
                    seen.push(i);
                    cursor = Some(i);
                }
                Step::Ended(i) => return (seen, i),
            }
        }
    }

    #[test]
    fn test_forward_from_start_to_end() {
        let (seen, end) = run(Direction::Forward, 10);
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(end, 9);
    }

    #[test]
    fn test_backward_from_end_to_start() {
        let (seen, end) = run(Direction::Backward, 10);
        assert_eq!(seen, (0..10).rev().collect::<Vec<_>>());
        assert_eq!(end, 0);
    }

    #[test]
    fn test_single_frame() {
        assert_eq!(advance(None, Direction::Forward, 1), Step::Moved(0));
        assert_eq!(advance(Some(0), Direction::Forward, 1), Step::Ended(0));
        assert_eq!(advance(Some(0), Direction::Backward, 1), Step::Ended(0));
    }

    #[test]
    fn test_mid_stream_steps() {
        assert_eq!(advance(Some(4), Direction::Forward, 10), Step::Moved(5));
        assert_eq!(advance(Some(4), Direction::Backward, 10), Step::Moved(3));
    }

    #[test]
    fn test_direction_from_flag() {
        assert!(Direction::from_backward(true).is_backward());
        assert_eq!(Direction::from_backward(false), Direction::Forward);
        assert_eq!(Direction::Backward.to_string(), "backward");
    }
}

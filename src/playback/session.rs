// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Per-frame hooks run by the playback worker before a frame is emitted.

use super::advance::Direction;
use super::source::Frame;

/// A consumer of emitted frames, such as an assisted-labelling pass.
pub trait Session: Send {
    fn name(&self) -> &str;

    /// Called for every frame the engine emits, in emission order.
    fn on_frame(&mut self, index: usize, frame: &Frame);

    fn on_direction(&mut self, _direction: Direction) {}
}

/// Bounding-box session. Records what it has been shown but proposes
/// nothing yet.
#[derive(Debug, Default)]
pub struct BoundingBoxSession {
    frame_size: Option<(u32, u32)>,
    last_index: Option<usize>,
    frames_seen: usize,
    direction: Direction,
}

impl BoundingBoxSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.frame_size
    }

    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl Session for BoundingBoxSession {
    fn name(&self) -> &str {
        "bbox"
    }

    fn on_frame(&mut self, index: usize, frame: &Frame) {
        self.frame_size = Some(frame.dimensions());
        self.last_index = Some(index);
        self.frames_seen += 1;
    }

    fn on_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }
}

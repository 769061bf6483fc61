// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.

use crate::error::{Error, Result};

/// Compute the output size of a resized frame.
///
/// With `keep_ratio`, the width target wins over the height target and the
/// other side follows the source aspect ratio; at least one target is then
/// required. Without it, a missing target keeps the source size.
pub fn resize_calculator(
    orig_width: u32,
    orig_height: u32,
    target_width: Option<u32>,
    target_height: Option<u32>,
    keep_ratio: bool,
) -> Result<(u32, u32)> {
    if orig_width == 0 || orig_height == 0 {
        return Err(Error::config("cannot resize an empty frame"));
    }

    if !keep_ratio {
        return Ok((
            target_width.unwrap_or(orig_width),
            target_height.unwrap_or(orig_height),
        ));
    }

    match (target_width, target_height) {
        (Some(w), _) => {
            let ratio = w as f64 / orig_width as f64;
            Ok((w, (orig_height as f64 * ratio) as u32))
        }
        (None, Some(h)) => {
            let ratio = h as f64 / orig_height as f64;
            Ok(((orig_width as f64 * ratio) as u32, h))
        }
        (None, None) => Err(Error::config(
            "neither target width nor height given while keeping aspect ratio",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_keeps_ratio_from_width() {
        assert_eq!(resize_calculator(640, 320, Some(320), None, true).unwrap(), (320, 160));
        // width wins when both are given
        assert_eq!(resize_calculator(640, 320, Some(320), Some(999), true).unwrap(), (320, 160));
    }

    #[test]
    fn test_resize_keeps_ratio_from_height() {
        assert_eq!(resize_calculator(640, 320, None, Some(160), true).unwrap(), (320, 160));
    }

    #[test]
    fn test_resize_without_ratio() {
        assert_eq!(resize_calculator(640, 320, None, Some(100), false).unwrap(), (640, 100));
        assert!(resize_calculator(640, 320, None, None, true).is_err());
    }
}

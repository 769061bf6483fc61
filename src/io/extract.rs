// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Export of annotated frames as still images.
//!
//! Every frame that carries at least one instance is decoded once and
//! written as `<frame_id>.jpg` into the output directory, which is emptied
//! first so that it only ever holds the frames of the latest run.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::playback::source::{Frame, FrameReader};

/// Directory name, under the dataset's `data/`, that receives the images.
pub const EXTRACTED_DIR: &str = ".extracted";

/// Outcome of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Frames written, in ascending order.
    pub written: Vec<usize>,
    /// Requested frames the source does not have.
    pub skipped: Vec<usize>,
}

/// Path of the image written for `frame`.
pub fn frame_path(out_dir: &Path, frame: usize) -> PathBuf {
    out_dir.join(format!("{frame}.jpg"))
}

fn save_jpeg(frame: &Frame, path: &Path) -> Result<()> {
    frame
        .save_with_format(path, image::ImageFormat::Jpeg)
        .map_err(|e| match e {
            image::ImageError::IoError(source) => Error::io(path, source),
            other => Error::SourceUnavailable(format!("encode {}: {other}", path.display())),
        })
}

/// Decode `frames` from `reader` and write them into `out_dir`.
///
/// Duplicates are read once and frames are visited in ascending order, so
/// consecutive annotated frames are decoded without seeking. An empty
/// request leaves `out_dir` untouched.
pub fn extract_frames(
    reader: &mut FrameReader,
    frames: &[usize],
    out_dir: &Path,
) -> Result<ExtractReport> {
    let mut wanted = frames.to_vec();
    wanted.sort_unstable();
    wanted.dedup();

    let mut report = ExtractReport::default();
    if wanted.is_empty() {
        log::warn!("No annotated frames, leaving {} as is", out_dir.display());
        return Ok(report);
    }

    if out_dir.exists() {
        std::fs::remove_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;
    }
    std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;

    let length = reader.len();
    for frame in wanted {
        if frame >= length {
            log::warn!("Frame {frame} is past the end of the source ({length} frames)");
            report.skipped.push(frame);
            continue;
        }
        let image = reader.read_at(frame)?;
        save_jpeg(&image, &frame_path(out_dir, frame))?;
        report.written.push(frame);
    }

    log::info!(
        "Extracted {} frames into {}",
        report.written.len(),
        out_dir.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::media::load_image;
    use crate::playback::source::MemorySource;

    fn reader(length: usize) -> FrameReader {
        FrameReader::new(Box::new(MemorySource::generated(length, 16, 16).unwrap()))
    }

    /// Red channel of a generated frame holds its index; jpeg shifts it a little.
    fn red_close_to(image: &Frame, frame: usize) -> bool {
        (image.get_pixel(8, 8)[0] as usize).abs_diff(frame) <= 3
    }

    #[test]
    fn test_writes_each_annotated_frame_once() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join(EXTRACTED_DIR);
        let mut reader = reader(20);

        let report = extract_frames(&mut reader, &[12, 3, 4, 12, 5], &out).unwrap();
        assert_eq!(report.written, vec![3, 4, 5, 12]);
        assert!(report.skipped.is_empty());
        // 3, 4, 5 decode in a row, 12 needs one more seek
        assert_eq!(reader.stats().seeks, 2);

        for frame in [3, 4, 5, 12] {
            let image = load_image(&frame_path(&out, frame)).unwrap();
            assert_eq!(image.dimensions(), (16, 16));
            assert!(red_close_to(&image, frame));
        }
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 4);
    }

    #[test]
    fn test_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join(EXTRACTED_DIR);
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("99.jpg"), b"stale").unwrap();

        extract_frames(&mut reader(4), &[1], &out).unwrap();
        let names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1.jpg".to_string()]);
    }

    #[test]
    fn test_no_frames_leaves_directory_alone() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join(EXTRACTED_DIR);
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("7.jpg"), b"kept").unwrap();

        let report = extract_frames(&mut reader(4), &[], &out).unwrap();
        assert_eq!(report, ExtractReport::default());
        assert_eq!(std::fs::read(out.join("7.jpg")).unwrap(), b"kept");
    }

    #[test]
    fn test_frames_past_the_end_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join(EXTRACTED_DIR);
        let report = extract_frames(&mut reader(3), &[2, 3, 8], &out).unwrap();
        assert_eq!(report.written, vec![2]);
        assert_eq!(report.skipped, vec![3, 8]);
        assert!(frame_path(&out, 2).is_file());
        assert!(!frame_path(&out, 3).exists());
    }
}

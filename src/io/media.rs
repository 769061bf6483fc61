// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading (images and videos).
//!
//! Image directories are decoded with the `image` crate. Video files need
//! the `video-opencv` feature.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::playback::source::{Frame, FrameSource};

/// Extensions read as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Extensions read as video files.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| allowed.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn is_image(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

pub fn is_video(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Load a single image as an RGB frame.
pub fn load_image(path: &Path) -> Result<Frame> {
    let img = image::open(path)
        .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", path.display())))?;
    Ok(img.to_rgb8())
}

/// Sort key for frame files: numeric stems in numeric order, then by name.
fn frame_order(path: &Path) -> (Option<u64>, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (stem.parse().ok(), stem)
}

/// A directory of still images played as a video, one image per frame.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    position: usize,
    width: u32,
    height: u32,
}

impl ImageSequence {
    pub fn open(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        if paths.is_empty() {
            return Err(Error::SourceUnavailable(format!(
                "no images in {}",
                dir.display()
            )));
        }
        paths.sort_by_key(|p| frame_order(p));

        let (width, height) = load_image(&paths[0])?.dimensions();
        log::info!(
            "Opened image sequence {} ({} frames, {}x{})",
            dir.display(),
            paths.len(),
            width,
            height
        );
        Ok(Self {
            paths,
            position: 0,
            width,
            height,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl FrameSource for ImageSequence {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn read_next(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.position) else {
            return Ok(None);
        };
        let frame = load_image(path)?;
        if frame.dimensions() != (self.width, self.height) {
            return Err(Error::SourceUnavailable(format!(
                "{} is {}x{}, expected {}x{}",
                path.display(),
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        self.position += 1;
        Ok(Some(frame))
    }

    fn set_position(&mut self, index: usize) -> Result<()> {
        self.position = index;
        Ok(())
    }
}

#[cfg(feature = "video-opencv")]
pub use video::OpenCvVideo;

#[cfg(feature = "video-opencv")]
mod video {
    use std::path::Path;

    use opencv::{core::Mat, imgproc, prelude::*, videoio};

    use crate::error::{Error, Result};
    use crate::playback::source::{Frame, FrameSource};

    fn cv_error(e: opencv::Error) -> Error {
        Error::SourceUnavailable(e.to_string())
    }

    /// A video file decoded through OpenCV.
    pub struct OpenCvVideo {
        capture: videoio::VideoCapture,
        length: usize,
        width: u32,
        height: u32,
    }

    impl OpenCvVideo {
        pub fn open(path: &Path) -> Result<Self> {
            let name = path.to_string_lossy();
            let capture =
                videoio::VideoCapture::from_file(&name, videoio::CAP_ANY).map_err(cv_error)?;
            if !capture.is_opened().map_err(cv_error)? {
                return Err(Error::SourceUnavailable(format!("cannot open {name}")));
            }
            let length = capture
                .get(videoio::CAP_PROP_FRAME_COUNT)
                .map_err(cv_error)?
                .max(0.0) as usize;

            let mut video = Self {
                capture,
                length,
                width: 0,
                height: 0,
            };
            // frame size from frame 0
            let first = video
                .read_next()?
                .ok_or_else(|| Error::SourceUnavailable(format!("{name} has no frames")))?;
            video.width = first.width();
            video.height = first.height();
            video.set_position(0)?;

            log::info!(
                "Opened video {} ({} frames, {}x{})",
                name,
                video.length,
                video.width,
                video.height
            );
            Ok(video)
        }
    }

    impl FrameSource for OpenCvVideo {
        fn len(&self) -> usize {
            self.length
        }

        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn read_next(&mut self) -> Result<Option<Frame>> {
            let mut mat = Mat::default();
            if !self.capture.read(&mut mat).map_err(cv_error)? || mat.empty() {
                return Ok(None);
            }
            let mut rgb = Mat::default();
            imgproc::cvt_color(&mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0).map_err(cv_error)?;
            let (cols, rows) = (rgb.cols() as u32, rgb.rows() as u32);
            let data = rgb.data_bytes().map_err(cv_error)?.to_vec();
            Frame::from_raw(cols, rows, data)
                .map(Some)
                .ok_or_else(|| Error::SourceUnavailable("decoded frame has wrong size".into()))
        }

        fn set_position(&mut self, index: usize) -> Result<()> {
            self.capture
                .set(videoio::CAP_PROP_POS_FRAMES, index as f64)
                .map_err(cv_error)?;
            Ok(())
        }
    }
}

/// Open a frame source: a directory is read as an image sequence, a file
/// as a video.
pub fn open_source(path: &Path) -> Result<Box<dyn FrameSource>> {
    if path.is_dir() {
        return Ok(Box::new(ImageSequence::open(path)?));
    }
    if !path.exists() {
        return Err(Error::SourceUnavailable(format!(
            "{} does not exist",
            path.display()
        )));
    }
    open_video(path)
}

#[cfg(feature = "video-opencv")]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(OpenCvVideo::open(path)?))
}

#[cfg(not(feature = "video-opencv"))]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    Err(Error::SourceUnavailable(format!(
        "{}: built without video support (enable the video-opencv feature)",
        path.display()
    )))
}

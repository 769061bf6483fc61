// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame sources and the positioned reader the engine decodes through.

use crate::error::{Error, Result};

/// A decoded frame.
pub type Frame = image::RgbImage;

/// A fixed-length, zero-indexed sequence of decodable frames.
pub trait FrameSource: Send {
    /// Number of frames. Treated as authoritative.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Native frame width in pixels.
    fn width(&self) -> u32;

    /// Native frame height in pixels.
    fn height(&self) -> u32;

    /// Decode the frame at the read position and move past it.
    /// `Ok(None)` means the source has nothing left.
    fn read_next(&mut self) -> Result<Option<Frame>>;

    /// Move the read position to `index`.
    fn set_position(&mut self, index: usize) -> Result<()>;
}

/// How often the reader took each decode path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub sequential: u64,
    pub seeks: u64,
}

/// A frame source plus the index its next sequential read will return.
pub struct FrameReader {
    source: Box<dyn FrameSource>,
    next: usize,
    stats: ReaderStats,
}

impl FrameReader {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            next: 0,
            stats: ReaderStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.source.width(), self.source.height())
    }

    /// Index the next sequential read would return.
    pub fn position(&self) -> usize {
        self.next
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Decode frame `index`, reading sequentially when already positioned
    /// there and seeking otherwise.
    pub fn read_at(&mut self, index: usize) -> Result<Frame> {
        let length = self.source.len();
        if index >= length {
            return Err(Error::FrameOutOfRange { index, length });
        }
        if self.next == index {
            self.stats.sequential += 1;
        } else {
            self.source.set_position(index)?;
            self.stats.seeks += 1;
        }
        // any failure leaves the position unknown
        self.next = usize::MAX;
        let frame = self.source.read_next()?.ok_or_else(|| {
            Error::invariant(format!("decoder returned no frame at {index} of {length}"))
        })?;
        self.next = index + 1;
        Ok(frame)
    }

    /// Put the read position back to `index`.
    pub fn restore(&mut self, index: usize) -> Result<()> {
        if index == self.next {
            return Ok(());
        }
        if index < self.source.len() {
            self.source.set_position(index)?;
            self.next = index;
        }
        Ok(())
    }
}

/// Frames held in memory.
pub struct MemorySource {
    frames: Vec<Frame>,
    position: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Result<Self> {
        let Some(first) = frames.first() else {
            return Err(Error::SourceUnavailable("no frames given".into()));
        };
        let dims = first.dimensions();
        if frames.iter().any(|f| f.dimensions() != dims) {
            return Err(Error::SourceUnavailable("frames differ in size".into()));
        }
        Ok(Self {
            frames,
            position: 0,
        })
    }

    /// `length` solid frames whose colour encodes their index; see
    /// [`frame_marker`].
    pub fn generated(length: usize, width: u32, height: u32) -> Result<Self> {
        let frames = (0..length)
            .map(|i| {
                let pixel = image::Rgb([(i % 256) as u8, ((i / 256) % 256) as u8, 0]);
                Frame::from_pixel(width, height, pixel)
            })
            .collect();
        Self::new(frames)
    }
}

/// Index encoded into a frame made by [`MemorySource::generated`].
pub fn frame_marker(frame: &Frame) -> usize {
    let p = frame.get_pixel(0, 0);
    p[0] as usize + 256 * p[1] as usize
}

impl FrameSource for MemorySource {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn width(&self) -> u32 {
        self.frames[0].width()
    }

    fn height(&self) -> u32 {
        self.frames[0].height()
    }

    fn read_next(&mut self) -> Result<Option<Frame>> {
        let frame = self.frames.get(self.position).cloned();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }

    fn set_position(&mut self, index: usize) -> Result<()> {
        self.position = index;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(length: usize) -> FrameReader {
        FrameReader::new(Box::new(MemorySource::generated(length, 4, 2).unwrap()))
    }

    #[test]
    fn test_generated_frames_carry_index() {
        let mut src = MemorySource::generated(300, 2, 2).unwrap();
        src.set_position(299).unwrap();
        assert_eq!(frame_marker(&src.read_next().unwrap().unwrap()), 299);
        assert!(src.read_next().unwrap().is_none());
    }

    #[test]
    fn test_empty_source_is_unavailable() {
        assert!(matches!(MemorySource::new(Vec::new()), Err(Error::SourceUnavailable(_))));
    }

    #[test]
    fn test_consecutive_reads_are_sequential() {
        let mut r = reader(5);
        for i in 0..5 {
            assert_eq!(frame_marker(&r.read_at(i).unwrap()), i);
        }
        assert_eq!(r.stats(), ReaderStats { sequential: 5, seeks: 0 });
    }

    #[test]
    fn test_jumps_seek() {
        let mut r = reader(5);
        assert_eq!(frame_marker(&r.read_at(3).unwrap()), 3);
        assert_eq!(frame_marker(&r.read_at(2).unwrap()), 2);
        assert_eq!(r.stats().seeks, 2);
        assert_eq!(r.position(), 3);
    }

    #[test]
    fn test_restore_position() {
        let mut r = reader(5);
        r.read_at(0).unwrap();
        let saved = r.position();
        r.read_at(4).unwrap();
        r.restore(saved).unwrap();
        assert_eq!(frame_marker(&r.read_at(1).unwrap()), 1);
        assert_eq!(r.stats().seeks, 2);
    }

    #[test]
    fn test_out_of_range_read() {
        let mut r = reader(2);
        assert!(matches!(r.read_at(2), Err(Error::FrameOutOfRange { index: 2, length: 2 })));
    }

    struct ShortSource;

    impl FrameSource for ShortSource {
        fn len(&self) -> usize {
            3
        }
        fn width(&self) -> u32 {
            1
        }
        fn height(&self) -> u32 {
            1
        }
        fn read_next(&mut self) -> Result<Option<Frame>> {
            Ok(None)
        }
        fn set_position(&mut self, _index: usize) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_missing_frame_is_invariant_violation() {
        let mut r = FrameReader::new(Box::new(ShortSource));
        assert!(matches!(r.read_at(1), Err(Error::InvariantViolation(_))));
        // position unknown afterwards, so the next read seeks
        let _ = r.read_at(2);
        assert_eq!(r.stats().seeks, 2);
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types shared by the annotation store and the playback engine.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A row or value that cannot be turned into a typed record.
    #[error("format error (line {line}): {reason}")]
    Format { line: usize, reason: String },

    /// A track id that does not exist in the store.
    #[error("address error: track {0} does not exist")]
    UnknownTrack(usize),

    /// An instance position that does not exist in its tracked object.
    #[error("address error: instance {instance_id} out of range for track {track_id} ({len} instances)")]
    IndexOutOfRange {
        track_id: usize,
        instance_id: usize,
        len: usize,
    },

    /// A frame index outside the media length.
    #[error("address error: frame {index} out of range ({length} frames)")]
    FrameOutOfRange { index: usize, length: usize },

    /// A structurally invalid edit request.
    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    #[error("media source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("store has no backing file to save to")]
    NoBackingFile,

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    /// Internal consistency broken. Not recoverable by the caller.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl Error {
    pub fn format(line: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            line,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error reports a stale or invalid coordinate.
    pub fn is_address_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownTrack(_) | Self::IndexOutOfRange { .. } | Self::FrameOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_are_stable() {
        assert!(Error::format(3, "bad").to_string().starts_with("format error (line 3)"));
        assert!(Error::UnknownTrack(4).to_string().starts_with("address error"));
        assert!(Error::invariant("x").to_string().starts_with("invariant violation"));
    }

    #[test]
    fn test_address_errors_are_classified() {
        assert!(Error::UnknownTrack(0).is_address_error());
        assert!(Error::IndexOutOfRange {
            track_id: 0,
            instance_id: 2,
            len: 1
        }
        .is_address_error());
        assert!(!Error::NoBackingFile.is_address_error());
    }

    #[test]
    fn test_io_preserves_source() {
        let err = Error::io("a.csv", std::io::Error::other("boom"));
        assert!(err.to_string().contains("boom"));
        assert!(err.to_string().contains("a.csv"));
    }
}

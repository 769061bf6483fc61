// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! On-disk layout of one annotated recording.
//!
//! ```text
//! root/
//!   data/clip.mp4                 exactly one video
//!   data/.extracted/<frame>.jpg   written by `Dataset::extract`
//!   annotations/annotations.csv   the annotation table
//!   annotations/.meta_annotations.yaml
//! ```

use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::io::extract::{self, ExtractReport, EXTRACTED_DIR};
use crate::io::{media, serialization};
use crate::models::schema::Schema;
use crate::playback::source::{FrameReader, FrameSource};
use crate::store::AnnotationStore;

pub const DATA_DIR: &str = "data";
pub const ANNOTATIONS_DIR: &str = "annotations";
pub const ANNOTATIONS_FILE: &str = "annotations.csv";

/// Resolved paths of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    root: PathBuf,
    video: PathBuf,
    annotations: PathBuf,
}

fn list_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Dataset(format!("missing directory {}", dir.display())));
    }
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && keep(p))
        .collect();
    files.sort();
    Ok(files)
}

fn exactly_one(mut files: Vec<PathBuf>, what: &str, dir: &Path) -> Result<PathBuf> {
    match files.len() {
        1 => Ok(files.remove(0)),
        n => Err(Error::Dataset(format!(
            "expected exactly one {what} in {}, found {n}",
            dir.display()
        ))),
    }
}

fn is_table(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("csv")
}

impl Dataset {
    /// Resolve the video and annotation files under `root`.
    pub fn locate(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::Dataset(format!("{} is not a directory", root.display())));
        }

        let data_dir = root.join(DATA_DIR);
        let video = exactly_one(list_files(&data_dir, media::is_video)?, "video", &data_dir)?;

        let ann_dir = root.join(ANNOTATIONS_DIR);
        let preferred = ann_dir.join(ANNOTATIONS_FILE);
        let annotations = if preferred.is_file() {
            preferred
        } else {
            exactly_one(list_files(&ann_dir, is_table)?, "annotation table", &ann_dir)?
        };

        log::info!(
            "Dataset {}: video {}, annotations {}",
            root.display(),
            video.display(),
            annotations.display()
        );
        Ok(Self {
            root,
            video,
            annotations,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn video(&self) -> &Path {
        &self.video
    }

    pub fn annotations(&self) -> &Path {
        &self.annotations
    }

    pub fn metadata(&self) -> PathBuf {
        serialization::metadata_path(&self.annotations)
    }

    pub fn load_schema(&self) -> Result<Schema> {
        serialization::load_schema(&self.annotations)
    }

    /// Open the annotation store, saving back to the dataset's table.
    pub fn open_store(&self, config: StoreConfig) -> Result<AnnotationStore> {
        AnnotationStore::open(&self.annotations, self.load_schema()?, config)
    }

    pub fn open_video(&self) -> Result<Box<dyn FrameSource>> {
        media::open_source(&self.video)
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR).join(EXTRACTED_DIR)
    }

    /// Write every annotated frame of the dataset video into
    /// [`Dataset::extracted_dir`].
    pub fn extract(&self, config: StoreConfig) -> Result<ExtractReport> {
        self.extract_from(self.open_video()?, config)
    }

    /// Like [`Dataset::extract`], decoding from `source` instead of the
    /// dataset video.
    pub fn extract_from(
        &self,
        source: Box<dyn FrameSource>,
        config: StoreConfig,
    ) -> Result<ExtractReport> {
        let frames = self.open_store(config)?.frames();
        let mut reader = FrameReader::new(source);
        extract::extract_frames(&mut reader, &frames, &self.extracted_dir())
    }
}

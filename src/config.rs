// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Runtime settings for the annotation store and the playback engine.
//!
//! Settings are plain serde structs with defaults, so a settings file only
//! needs the keys it wants to override.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::io::serialization;

/// Persistence behaviour of an annotation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of rotated backup copies kept next to the primary file.
    pub backups: usize,
    /// Accepted edits between automatic saves. Zero disables autosave.
    pub autosave_step: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backups: 3,
            autosave_step: 5,
        }
    }
}

/// Playback engine behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rate_fps: f64,
    /// Poll interval of the idle worker, in milliseconds.
    pub idle_poll_ms: u64,
    /// Start in backward direction.
    pub backward: bool,
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
    /// Keep the source aspect ratio when resizing.
    pub keep_ratio: bool,
}

/// Time between two emitted frames at `rate_fps`. Fails for rates that
/// are not positive or whose interval does not fit a [`Duration`].
pub fn frame_interval(rate_fps: f64) -> Result<Duration> {
    if !(rate_fps.is_finite() && rate_fps > 0.0) {
        return Err(Error::config(format!("rate_fps must be positive, got {rate_fps}")));
    }
    Duration::try_from_secs_f64(1.0 / rate_fps)
        .map_err(|_| Error::config(format!("rate_fps {rate_fps} is too small")))
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rate_fps: 60.0,
            idle_poll_ms: 100,
            backward: false,
            target_width: None,
            target_height: None,
            keep_ratio: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        frame_interval(self.rate_fps)?;
        if self.idle_poll_ms == 0 {
            return Err(Error::config("idle_poll_ms must be positive"));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Result<Duration> {
        frame_interval(self.rate_fps)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    /// Whether frames are resized before being emitted.
    pub fn resizes(&self) -> bool {
        self.target_width.is_some() || self.target_height.is_some()
    }
}

/// All settings of one review session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreConfig,
    pub engine: EngineConfig,
}

impl Settings {
    /// Load settings from a YAML or JSON file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let settings: Settings = serialization::import_by_extension(path)?;
        settings.engine.validate()?;
        Ok(settings)
    }
}

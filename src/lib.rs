// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! MASA - Multi-object Annotation Store and Playback
//!
//! Core of a video annotation review tool: an editable store of tracked
//! objects backed by a delimited annotation table, and a background engine
//! that supplies decoded frames in either direction.

pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod playback;
pub mod store;
pub mod util;

pub use config::{EngineConfig, Settings, StoreConfig};
pub use error::{Error, Result};
pub use io::dataset::Dataset;
pub use models::instance::{Instance, InstancePatch, Number, Position};
pub use models::schema::{CoordinateUnit, Schema, TagCategory};
pub use models::tracked_object::TrackedObject;
pub use playback::{Direction, Frame, FrameSource, PlaybackEngine, PlaybackEvent, PlaybackState};
pub use store::{AnnotationStore, Change, Entry, Replacement, StoreSnapshot};

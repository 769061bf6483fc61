// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! YAML and JSON serialization.
//!
//! Used for metadata (allow-lists), settings and whole-store snapshots.
//! The annotation table itself lives in [`super::table`].

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::schema::Schema;

fn serde_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::config(format!("{}: {e}", path.display()))
}

/// Export data to YAML format.
pub fn export_yaml<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data).map_err(|e| serde_error(path, e))?;
    std::fs::write(path, yaml).map_err(|e| Error::io(path, e))
}

/// Export data to JSON format.
pub fn export_json<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| serde_error(path, e))?;
    std::fs::write(path, json).map_err(|e| Error::io(path, e))
}

/// Import data from YAML format.
pub fn import_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let yaml = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_yaml::from_str(&yaml).map_err(|e| serde_error(path, e))
}

/// Import data from JSON format.
pub fn import_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&json).map_err(|e| serde_error(path, e))
}

/// Pick YAML or JSON from the file extension.
pub fn import_by_extension<T: DeserializeOwned>(path: &Path) -> Result<T> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => import_yaml(path),
        Some("json") => import_json(path),
        other => Err(Error::config(format!("unsupported file extension: {other:?}"))),
    }
}

pub fn export_by_extension<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => export_yaml(data, path),
        Some("json") => export_json(data, path),
        other => Err(Error::config(format!("unsupported file extension: {other:?}"))),
    }
}

/// Metadata file that sits next to an annotations file:
/// `annotations/foo.csv` pairs with `annotations/.meta_foo.yaml`.
pub fn metadata_path(annotations: &Path) -> PathBuf {
    let stem = annotations
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    annotations.with_file_name(format!(".meta_{stem}.yaml"))
}

/// Load the allow-list schema for an annotations file.
pub fn load_schema(annotations: &Path) -> Result<Schema> {
    let path = metadata_path(annotations);
    if !path.exists() {
        return Err(Error::config(format!("cannot find meta file {}", path.display())));
    }
    let schema: Schema = import_yaml(&path)?;
    if schema.object_classes.is_empty() {
        return Err(Error::config(format!("{} lists no object classes", path.display())));
    }
    log::info!(
        "Loaded metadata {}: {} classes, {} tag categories",
        path.display(),
        schema.object_classes.len(),
        schema.tags.len()
    );
    Ok(schema)
}

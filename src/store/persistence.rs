// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Writing the primary annotation file with rotated backups.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Path of backup `index` for `path`: `dir/.#name.index`.
pub fn backup_path(path: &Path, index: usize) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".#{name}.{index}"))
}

/// Shift existing backups up by one, dropping the oldest, and copy the
/// current on-disk file into backup 0.
pub fn rotate_backups(path: &Path, count: usize) -> Result<()> {
    if count == 0 || !path.exists() {
        return Ok(());
    }
    for i in (1..count).rev() {
        let older = backup_path(path, i - 1);
        if older.exists() {
            let newer = backup_path(path, i);
            std::fs::rename(&older, &newer).map_err(|e| Error::io(&older, e))?;
        }
    }
    let first = backup_path(path, 0);
    std::fs::copy(path, &first).map_err(|e| Error::io(&first, e))?;
    Ok(())
}

/// Rotate backups, then replace the primary file with `contents`.
pub fn save_with_backups(path: &Path, contents: &str, backups: usize) -> Result<()> {
    rotate_backups(path, backups)?;
    std::fs::write(path, contents).map_err(|e| Error::io(path, e))?;
    log::info!("Saved annotations to {}", path.display());
    Ok(())
}

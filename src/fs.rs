//! Filesystem helpers shared by the persistence layers.

use crate::error::{Result, StatError};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Sibling path used while a file or directory is being rewritten.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to a temporary sibling, then rename it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StatError::io(parent, e))?;
    }
    let temp_path = staging_path(path);
    fs::write(&temp_path, bytes).map_err(|e| StatError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| StatError::io(path, e))?;
    Ok(())
}

/// Remove a file or a directory tree.
///
/// Returns `Ok(false)` when nothing existed at `path`.
pub(crate) fn remove_path(path: &Path) -> Result<bool> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StatError::io(path, e)),
    }
}

/// Recursively copy `from` into a fresh directory at `to`.
pub(crate) fn copy_dir(from: &Path, to: &Path) -> Result<u64> {
    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            StatError::io(path, e.into())
        })?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| StatError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| StatError::io(&target, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Names of the `*.json` files directly inside `dir` (empty if `dir` is missing).
pub(crate) fn json_file_names(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| StatError::io(dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(".json") {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

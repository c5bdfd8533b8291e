use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use walkdir::WalkDir;

use super::fingerprints::STORE_FILE_NAME;

const STAMP_FORMAT: &str = "[year][month][day]_[hour][minute][second]";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("path outside local root: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),
    #[error("timestamp format error: {0}")]
    Format(#[from] time::error::Format),
    #[error("invalid timestamp format: {0}")]
    FormatDescription(#[from] time::error::InvalidFormatDescription),
    #[error("local root has no parent directory: {0}")]
    NoParent(PathBuf),
    #[error("backup target already exists: {0}")]
    AlreadyExists(PathBuf),
}

pub fn backup_stamp(now: OffsetDateTime) -> Result<String, BackupError> {
    let format = time::format_description::parse(STAMP_FORMAT)?;
    Ok(now.format(&format)?)
}

/// `<root-name>_backup_<stamp>`, next to the root.
pub fn backup_target(root: &Path, stamp: &str) -> Result<PathBuf, BackupError> {
    let name = root
        .file_name()
        .ok_or_else(|| BackupError::NoParent(root.to_path_buf()))?;
    let parent = root
        .parent()
        .ok_or_else(|| BackupError::NoParent(root.to_path_buf()))?;
    Ok(parent.join(format!("{}_backup_{stamp}", name.to_string_lossy())))
}

/// Copies the mirror tree, minus the fingerprint store, to a timestamped
/// sibling. `Ok(None)` when there is nothing worth keeping.
pub fn backup_local_tree(
    root: &Path,
    now: OffsetDateTime,
) -> Result<Option<PathBuf>, BackupError> {
    if !root.is_dir() || !has_mirrored_files(root) {
        return Ok(None);
    }

    let target = backup_target(root, &backup_stamp(now)?)?;
    if target.exists() {
        return Err(BackupError::AlreadyExists(target));
    }
    fs::create_dir_all(&target)?;

    for entry in WalkDir::new(root) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(root)?;
        if rel.as_os_str().is_empty() || is_store_file(entry.path()) {
            continue;
        }
        let out = target.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out)?;
        } else {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &out)?;
        }
    }

    Ok(Some(target))
}

fn has_mirrored_files(root: &Path) -> bool {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .any(|entry| !entry.file_type().is_dir() && !is_store_file(entry.path()))
}

pub(crate) fn is_store_file(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == STORE_FILE_NAME)
}

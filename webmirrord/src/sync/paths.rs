use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Local file name used for the index resource (the base URL itself).
pub const INDEX_DOCUMENT: &str = "index.html";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("relative path contains unsupported component: {0}")]
    UnsupportedComponent(String),
}

/// Where one mirrored resource lives: remote suffix, store key and local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub remote: String,
    pub key: String,
    pub local: PathBuf,
}

impl Target {
    pub fn is_html(&self) -> bool {
        is_html_path(&self.key)
    }
}

pub fn normalize_relative(relative: &str) -> String {
    relative.replace('\\', "/").trim_start_matches('/').to_string()
}

/// The root `index.html` is always fetched from the base URL so the index
/// check and a full pass read the same resource.
pub fn resolve_target(local_root: &Path, relative: &str) -> Result<Target, PathError> {
    let mut remote = normalize_relative(relative);
    if remote == INDEX_DOCUMENT {
        remote.clear();
    }
    let key = if remote.is_empty() {
        INDEX_DOCUMENT.to_string()
    } else {
        remote.clone()
    };
    let local = local_path_for(local_root, &key)?;
    Ok(Target { remote, key, local })
}

pub fn local_path_for(local_root: &Path, key: &str) -> Result<PathBuf, PathError> {
    let mut out = local_root.to_path_buf();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => continue,
            Component::RootDir | Component::ParentDir | Component::Prefix(_) => {
                return Err(PathError::UnsupportedComponent(key.to_string()));
            }
        }
    }
    Ok(out)
}

pub fn is_html_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

pub const STORE_FILE_NAME: &str = ".file_hashes.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Relative path -> hash of the bytes last written there.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: PathBuf,
    hashes: BTreeMap<String, String>,
}

impl FingerprintStore {
    /// Never fails: a missing or corrupt file yields an empty store, which
    /// only costs one full re-check.
    pub fn load(local_root: &Path) -> Self {
        let path = local_root.join(STORE_FILE_NAME);
        let hashes = match read_hashes(&path) {
            Ok(hashes) => hashes,
            Err(StoreError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                BTreeMap::new()
            }
            Err(err) => {
                warn!("ignoring unreadable {}: {err}", path.display());
                BTreeMap::new()
            }
        };
        Self { path, hashes }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.hashes.get(key).map(String::as_str)
    }

    pub fn record(&mut self, key: impl Into<String>, hash: impl Into<String>) {
        self.hashes.insert(key.into(), hash.into());
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.hashes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.hashes)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

fn read_hashes(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    let raw = fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Lowercase hex MD5. Used for change detection only, not integrity.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "sync_config.json";
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timestamp format error: {0}")]
    Time(#[from] time::error::Format),
    #[error("remote url is not configured (set WEBMIRROR_REMOTE_URL or remote_url in {0})")]
    MissingRemoteUrl(String),
    #[error("local path is not configured (set WEBMIRROR_LOCAL_DIR or local_path in {0})")]
    MissingLocalPath(String),
}

/// On-disk shape of `sync_config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredConfig {
    #[serde(default)]
    pub remote_url: String,
    #[serde(default)]
    pub local_path: String,
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl Default for StoredConfig {
    fn default() -> Self {
        Self {
            remote_url: String::new(),
            local_path: String::new(),
            check_interval: DEFAULT_CHECK_INTERVAL_SECS,
            created_at: None,
            files: Vec::new(),
        }
    }
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub remote_url: Option<String>,
    pub local_path: Option<String>,
    pub check_interval: Option<u64>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            remote_url: read_string_env("WEBMIRROR_REMOTE_URL"),
            local_path: read_string_env("WEBMIRROR_LOCAL_DIR"),
            check_interval: read_u64_env("WEBMIRROR_CHECK_SECS"),
        }
    }

    fn is_empty(&self) -> bool {
        self.remote_url.is_none() && self.local_path.is_none() && self.check_interval.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub remote_url: String,
    pub local_root: PathBuf,
    pub check_interval: Duration,
    pub files: Vec<String>,
}

impl MirrorConfig {
    /// Reads `path`, applies env overrides and writes the merged result back
    /// when it differs, so later starts need no environment.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        let stored = load_stored(path)?;
        let existed = stored.is_some();
        let overrides = Overrides::from_env();
        let merged = merge(stored.clone().unwrap_or_default(), &overrides);
        let merged = stamp_created_at(merged, OffsetDateTime::now_utc())?;

        let config = Self::from_stored(&merged, path, &home_dir())?;
        if !existed || stored.as_ref() != Some(&merged) {
            match save_stored(path, &merged) {
                Ok(()) => info!("saved run configuration to {}", path.display()),
                Err(err) => warn!("failed to save {}: {err}", path.display()),
            }
        }
        Ok(config)
    }

    pub fn from_stored(
        stored: &StoredConfig,
        source: &Path,
        home: &Path,
    ) -> Result<Self, ConfigError> {
        let remote_url = stored.remote_url.trim().trim_end_matches('/').to_string();
        if remote_url.is_empty() {
            return Err(ConfigError::MissingRemoteUrl(source.display().to_string()));
        }
        let local_path = stored.local_path.trim();
        if local_path.is_empty() {
            return Err(ConfigError::MissingLocalPath(source.display().to_string()));
        }
        Ok(Self {
            remote_url,
            local_root: expand_with_home(local_path, home),
            check_interval: Duration::from_secs(stored.check_interval.max(1)),
            files: stored.files.clone(),
        })
    }
}

pub fn load_stored(path: &Path) -> Result<Option<StoredConfig>, ConfigError> {
    match fs::read(path) {
        Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub fn save_stored(path: &Path, config: &StoredConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

pub fn merge(mut stored: StoredConfig, overrides: &Overrides) -> StoredConfig {
    if overrides.is_empty() {
        return stored;
    }
    if let Some(url) = &overrides.remote_url {
        stored.remote_url = url.clone();
    }
    if let Some(local) = &overrides.local_path {
        stored.local_path = local.clone();
    }
    if let Some(interval) = overrides.check_interval {
        stored.check_interval = interval;
    }
    stored
}

fn stamp_created_at(
    mut stored: StoredConfig,
    now: OffsetDateTime,
) -> Result<StoredConfig, ConfigError> {
    if stored.created_at.is_none() {
        stored.created_at = Some(now.format(&Rfc3339)?);
    }
    Ok(stored)
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir)
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn read_string_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_u64_env(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use url::Url;
use walkdir::WalkDir;
use webmirror_core::{FetchError, MirrorClient, looks_like_not_found};

use super::backup::{backup_local_tree, is_store_file};
use super::fingerprints::{FingerprintStore, content_hash};
use super::local_file::{local_hash, write_atomic};
use super::paths::{PathError, resolve_target};
use super::sanitize::sanitize;
use crate::report;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("path error: {0}")]
    Path(#[from] PathError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    New,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Fetch,
    NotFoundPage,
    InvalidPath,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Written(WriteKind),
    Unchanged,
    Failed(FailureKind),
}

/// Per-pass counters; reset by every `sync_all`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncStats {
    fn count(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Written(_) => self.downloaded += 1,
            SyncOutcome::Unchanged => self.skipped += 1,
            SyncOutcome::Failed(_) => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub url: Url,
    pub raw_bytes: usize,
    pub sanitized_bytes: usize,
}

impl ProbeReport {
    pub fn removed_bytes(&self) -> usize {
        self.raw_bytes.saturating_sub(self.sanitized_bytes)
    }
}

struct Evaluation {
    display: String,
    outcome: SyncOutcome,
    detail: Option<String>,
}

pub struct SyncEngine {
    client: MirrorClient,
    store: FingerprintStore,
    local_root: PathBuf,
    fallback_paths: Vec<String>,
    stats: SyncStats,
}

impl SyncEngine {
    pub fn new(client: MirrorClient, local_root: PathBuf) -> Self {
        let store = FingerprintStore::load(&local_root);
        debug!(
            entries = store.len(),
            "loaded fingerprints from {}",
            store.path().display()
        );
        Self {
            client,
            store,
            local_root,
            fallback_paths: vec![String::new()],
            stats: SyncStats::default(),
        }
    }

    /// Paths synced when no local copy exists yet. Empty keeps the index alone.
    pub fn with_fallback_paths(mut self, paths: Vec<String>) -> Self {
        if !paths.is_empty() {
            self.fallback_paths = paths;
        }
        self
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub async fn sync_one(&mut self, relative: &str) -> SyncOutcome {
        self.sync_entry(relative, None).await
    }

    pub async fn sync_all(&mut self, paths: &[String]) -> SyncStats {
        self.stats = SyncStats::default();
        if paths.is_empty() {
            report::print_empty_list_hint();
        } else {
            report::print_pass_header(paths.len());
        }

        let total = paths.len();
        for (index, path) in paths.iter().enumerate() {
            self.sync_entry(path, Some((index + 1, total))).await;
        }

        self.persist_fingerprints();
        report::print_summary(&self.stats);
        self.stats
    }

    /// Writes the in-memory store to disk; failures are logged only.
    pub fn persist_fingerprints(&self) {
        if let Err(err) = self.store.save() {
            warn!("failed to save {}: {err}", self.store.path().display());
        }
    }

    /// Full pass. With `auto_detect`, mirrors whatever already exists locally;
    /// falls back to the configured list when that finds nothing.
    pub async fn resync(&mut self, auto_detect: bool) -> SyncStats {
        let mut paths = Vec::new();
        if auto_detect {
            paths = self.discover_local_paths();
            info!(files = paths.len(), "auto-detected local files");
        }
        if paths.is_empty() {
            paths = self.fallback_paths.clone();
        }
        self.sync_all(&paths).await
    }

    pub fn discover_local_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = WalkDir::new(&self.local_root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && !is_store_file(entry.path()))
            .filter_map(|entry| {
                let rel = entry.path().strip_prefix(&self.local_root).ok()?;
                let parts: Vec<_> = rel
                    .components()
                    .map(|part| part.as_os_str().to_string_lossy().into_owned())
                    .collect();
                Some(parts.join("/"))
            })
            .collect();
        paths.sort();
        paths
    }

    /// Cheap steady-state check: one fetch of the index. A difference from the
    /// local index triggers a backup and a full pass.
    pub async fn check_index_for_change(&mut self) -> Result<bool, EngineError> {
        let body = self.fetch_checked("").await?;
        let remote_hash = content_hash(&sanitize(&body));
        let index = resolve_target(&self.local_root, "")?;
        let local = local_hash(&index.local).await;

        if local.as_deref() == Some(remote_hash.as_str()) {
            info!("index unchanged");
            return Ok(false);
        }

        match &local {
            Some(local) => info!(
                local = &local[..16],
                remote = &remote_hash[..16],
                "index changed"
            ),
            None => info!("no local index yet, first sync"),
        }
        self.backup();
        self.resync(local.is_some()).await;
        Ok(true)
    }

    /// Startup connectivity check against the index resource.
    pub async fn probe_index(&self) -> Result<ProbeReport, EngineError> {
        let body = self.fetch_checked("").await?;
        Ok(ProbeReport {
            url: self.client.base_url().clone(),
            raw_bytes: body.len(),
            sanitized_bytes: sanitize(&body).len(),
        })
    }

    /// Best-effort; a failed backup never blocks the resync.
    pub fn backup(&self) -> Option<PathBuf> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        match backup_local_tree(&self.local_root, now) {
            Ok(Some(target)) => {
                info!("backed up local copy to {}", target.display());
                Some(target)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("backup failed: {err}");
                None
            }
        }
    }

    async fn sync_entry(
        &mut self,
        relative: &str,
        position: Option<(usize, usize)>,
    ) -> SyncOutcome {
        let evaluation = self.evaluate(relative).await;
        self.stats.count(evaluation.outcome);
        report::print_progress(
            position,
            &evaluation.display,
            evaluation.outcome,
            evaluation.detail.as_deref(),
        );
        evaluation.outcome
    }

    async fn evaluate(&mut self, relative: &str) -> Evaluation {
        let target = match resolve_target(&self.local_root, relative) {
            Ok(target) => target,
            Err(err) => {
                warn!("skipping {relative}: {err}");
                return Evaluation {
                    display: relative.to_string(),
                    outcome: SyncOutcome::Failed(FailureKind::InvalidPath),
                    detail: None,
                };
            }
        };
        let failed = |kind: FailureKind, detail: Option<String>| Evaluation {
            display: target.key.clone(),
            outcome: SyncOutcome::Failed(kind),
            detail,
        };

        let body = match self.fetch_checked(&target.remote).await {
            Ok(body) => body,
            Err(FetchError::NotFoundPage) => return failed(FailureKind::NotFoundPage, None),
            Err(err) => {
                warn!(path = %target.key, "fetch failed: {err}");
                return failed(FailureKind::Fetch, Some(err.diagnostic()));
            }
        };
        let content = if target.is_html() {
            sanitize(&body)
        } else {
            body
        };

        let remote_hash = content_hash(&content);
        let local = local_hash(&target.local).await;
        let unchanged = local.as_deref() == Some(remote_hash.as_str())
            && self.store.get(&target.key) == Some(remote_hash.as_str());
        if unchanged {
            return Evaluation {
                display: target.key,
                outcome: SyncOutcome::Unchanged,
                detail: None,
            };
        }

        if let Err(err) = write_atomic(&target.local, &content).await {
            warn!("failed to write {}: {err}", target.local.display());
            return failed(FailureKind::Write, Some(err.to_string()));
        }
        self.store.record(target.key.clone(), remote_hash);

        let kind = if local.is_none() {
            WriteKind::New
        } else {
            WriteKind::Updated
        };
        Evaluation {
            display: target.key,
            outcome: SyncOutcome::Written(kind),
            detail: None,
        }
    }

    async fn fetch_checked(&self, remote: &str) -> Result<Vec<u8>, FetchError> {
        let body = self.client.fetch(remote).await?;
        if looks_like_not_found(&body) {
            return Err(FetchError::NotFoundPage);
        }
        Ok(body)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

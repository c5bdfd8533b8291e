use std::future::Future;
use std::pin::pin;

use anyhow::Context;
use tracing::{debug, info, warn};
use webmirror_core::MirrorClient;

use crate::config::MirrorConfig;
use crate::report;
use crate::sync::engine::{ProbeReport, SyncEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Checking,
    Sleeping,
    Stopped,
}

pub struct MirrorRuntime {
    config: MirrorConfig,
    engine: SyncEngine,
    state: PollState,
}

impl MirrorRuntime {
    pub fn bootstrap(config: MirrorConfig) -> anyhow::Result<Self> {
        let client = MirrorClient::new(&config.remote_url)
            .with_context(|| format!("invalid remote url {:?}", config.remote_url))?;
        let engine = SyncEngine::new(client, config.local_root.clone())
            .with_fallback_paths(config.files.clone());
        Ok(Self {
            config,
            engine,
            state: PollState::Idle,
        })
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Polls until ctrl-c.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// One probe plus one change check, for cron-style use.
    pub async fn run_once(&mut self) -> anyhow::Result<bool> {
        self.print_banner();
        self.transition(PollState::Checking);
        self.probe().await?;
        let changed = self.engine.check_index_for_change().await?;
        self.transition(PollState::Stopped);
        Ok(changed)
    }

    /// Probe (fatal on failure), check once, then sleep/check until `shutdown`
    /// resolves. A failed check is logged and the next tick retries. A check
    /// cut short by `shutdown` still persists the fingerprints gathered so far.
    pub async fn run_until<F>(&mut self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = pin!(shutdown);
        self.print_banner();

        self.transition(PollState::Checking);
        let probe = tokio::select! {
            probe = self.probe() => probe,
            _ = &mut shutdown => {
                self.stop();
                return Ok(());
            }
        };
        probe?;

        loop {
            self.transition(PollState::Checking);
            let checked = tokio::select! {
                checked = self.engine.check_index_for_change() => Some(checked),
                _ = &mut shutdown => None,
            };
            match checked {
                None => {
                    // files written before the cancel are already on disk
                    self.engine.persist_fingerprints();
                    break;
                }
                Some(Ok(true)) => info!("mirror refreshed"),
                Some(Ok(false)) => println!("✓ no change"),
                Some(Err(err)) => warn!("check failed: {err}; continuing to monitor"),
            }

            self.transition(PollState::Sleeping);
            tokio::select! {
                _ = tokio::time::sleep(self.config.check_interval) => {}
                _ = &mut shutdown => break,
            }
        }

        self.stop();
        Ok(())
    }

    async fn probe(&self) -> anyhow::Result<ProbeReport> {
        let report = match self.engine.probe_index().await {
            Ok(report) => report,
            Err(err) => {
                println!("❌ cannot reach {}: {err}", self.config.remote_url);
                return Err(err).context("initial connectivity check failed");
            }
        };
        println!("✅ connected: {}", report.url);
        println!(
            "   served {} bytes, {} after cleanup, {} bytes of injected markup removed",
            report.raw_bytes,
            report.sanitized_bytes,
            report.removed_bytes()
        );
        Ok(report)
    }

    fn print_banner(&self) {
        println!("{}", report::rule());
        println!("🚀 webmirror");
        println!("📡 remote:   {}", self.config.remote_url);
        println!("💾 local:    {}", self.config.local_root.display());
        println!("⏱️  interval: {}s", self.config.check_interval.as_secs());
        println!("⌨️  Ctrl+C to stop");
        println!("{}", report::rule());
    }

    fn stop(&mut self) {
        self.transition(PollState::Stopped);
        println!("👋 stopped");
    }

    fn transition(&mut self, next: PollState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "poll state");
            self.state = next;
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed waiting for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;

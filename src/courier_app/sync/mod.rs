//! # Background Sync Service
//!
//! Keeps the offline queue moving without the UI having to ask.
//!
//! ## Architecture
//!
//! The sync service coordinates:
//! - **Network Monitor**: connectivity detection and reachability probes
//! - **Sync State**: notifications and status snapshots for the UI
//! - **Action Queue**: the drains themselves
//!
//! One background task reacts to three triggers:
//! - a connectivity transition (reconnect → probe → drain; offline → notice)
//! - a periodic safety-net tick
//! - the backoff timer set by a drain that stopped on a retryable failure
//!
//! ## Usage
//!
//! ```rust,no_run
//! use courier_sync::courier_app::offline::ActionQueueManager;
//! use courier_sync::courier_app::sync::{SyncConfig, SyncService};
//!
//! # async fn example(manager: ActionQueueManager) {
//! let mut sync_service = SyncService::new(manager, SyncConfig::default());
//! sync_service.start().expect("sync already running");
//!
//! // Force immediate sync
//! let report = sync_service.force_sync().await;
//! println!("{} actions still queued", report.remaining);
//!
//! sync_service.stop().await;
//! # }
//! ```

pub mod network_monitor;
pub mod sync_state;

pub use network_monitor::{ConnectivityMonitor, ConnectivityProbe, NetworkStatus, Subscription};
pub use sync_state::{SyncEvent, SyncEvents, SyncListenerHandle, SyncState};

use crate::courier_app::offline::{ActionQueueManager, DrainReport};
use crate::shared::AppConfig;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Shortest safety-net period; smaller intervals are raised to this
pub const MIN_DRAIN_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the sync service
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Run the periodic safety-net drain
    pub auto_sync: bool,
    /// Safety-net period, see [`SyncConfig::drain_period`]
    pub drain_interval: Duration,
    /// Refresh the job list after a drain that changed something
    pub refresh_after_drain: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            drain_interval: Duration::from_secs(30),
            refresh_after_drain: true,
        }
    }
}

impl SyncConfig {
    /// Period actually used by the ticker, never below [`MIN_DRAIN_INTERVAL`]
    pub fn drain_period(&self) -> Duration {
        self.drain_interval.max(MIN_DRAIN_INTERVAL)
    }
}

impl From<&AppConfig> for SyncConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            drain_interval: config.drain_interval(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Background sync is already running")]
    AlreadyRunning,
}

/// Owns the background sync task
#[derive(Debug)]
pub struct SyncService {
    manager: ActionQueueManager,
    config: SyncConfig,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl SyncService {
    pub fn new(manager: ActionQueueManager, config: SyncConfig) -> Self {
        Self {
            manager,
            config,
            shutdown: None,
            task: None,
        }
    }

    pub fn manager(&self) -> &ActionQueueManager {
        &self.manager
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Start background synchronization
    pub fn start(&mut self) -> Result<(), SyncError> {
        if self.is_running() {
            return Err(SyncError::AlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let manager = self.manager.clone();
        let config = self.config.clone();
        self.task = Some(tokio::spawn(run(manager, config, shutdown_rx)));
        self.shutdown = Some(shutdown_tx);
        tracing::info!("[Sync] background sync started");
        Ok(())
    }

    /// Stop background synchronization, letting a running drain finish
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!("[Sync] background task failed: {}", e);
                }
            }
        }
        tracing::info!("[Sync] background sync stopped");
    }

    /// Probe, drain and refresh right now
    pub async fn force_sync(&self) -> DrainReport {
        self.manager.connectivity().force_check().await;
        sync_once(&self.manager, &self.config).await
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn sync_once(manager: &ActionQueueManager, config: &SyncConfig) -> DrainReport {
    let report = manager.drain().await;
    if config.refresh_after_drain
        && !report.coalesced
        && (report.sent > 0 || report.dead_lettered > 0)
    {
        if let Err(e) = manager.refresh().await {
            tracing::warn!("[Sync] refresh after drain failed: {}", e);
        }
    }
    report
}

fn retry_deadline(report: &DrainReport) -> Option<Instant> {
    report.retry_after.map(|delay| Instant::now() + delay)
}

async fn run(manager: ActionQueueManager, config: SyncConfig, mut shutdown: watch::Receiver<bool>) {
    let connectivity = manager.connectivity().clone();
    let events = manager.sync_events().clone();

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let _subscription = connectivity.subscribe(move |status| {
        let _ = status_tx.send(status);
    });

    let mut ticker = tokio::time::interval(config.drain_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut retry_at: Option<Instant> = None;

    loop {
        let retry = async move {
            match retry_at {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = shutdown.changed() => break,
            Some(status) = status_rx.recv() => match status {
                NetworkStatus::Online => {
                    events.emit(SyncEvent::Reconnected);
                    if connectivity.force_check().await.is_online() {
                        let report = sync_once(&manager, &config).await;
                        retry_at = retry_deadline(&report);
                    }
                }
                NetworkStatus::Offline => {
                    events.emit(SyncEvent::WentOffline);
                    retry_at = None;
                }
            },
            _ = ticker.tick(), if config.auto_sync => {
                if !connectivity.can_drain() {
                    connectivity.force_check().await;
                }
                if connectivity.can_drain() && retry_at.is_none() {
                    let report = sync_once(&manager, &config).await;
                    retry_at = retry_deadline(&report);
                }
            }
            _ = retry => {
                retry_at = None;
                if connectivity.can_drain() {
                    tracing::debug!("[Sync] retrying drain after backoff");
                    let report = sync_once(&manager, &config).await;
                    retry_at = retry_deadline(&report);
                }
            }
        }
    }
}

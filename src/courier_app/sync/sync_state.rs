//! # Sync State Management
//!
//! Sync notifications for the UI (toasts, banners, badges) and a snapshot of
//! the queue's current sync state.
//!
//! Events go out on a `tokio::sync::broadcast` channel; every subscriber gets
//! its own copy and unsubscribes by dropping its receiver or handle.

use crate::courier_app::sync::network_monitor::NetworkStatus;
use crate::shared::{ActionKind, JobId, JobStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

/// User-visible sync notifications
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Connectivity dropped; actions are now queued locally
    WentOffline,
    /// Connectivity came back
    Reconnected,
    DrainStarted {
        pending: usize,
    },
    /// `remaining > 0` means a partial sync
    DrainFinished {
        sent: usize,
        remaining: usize,
        dead_lettered: usize,
    },
    /// An action needs the courier's attention
    ActionDeadLettered {
        action_id: Uuid,
        job_id: JobId,
        kind: ActionKind,
        reason: String,
    },
    /// Credentials were refused; queued actions wait for re-authentication
    AuthRequired {
        status: u16,
    },
    /// Local storage is full
    StorageWarning {
        evicted: Vec<Uuid>,
        message: String,
    },
    /// Server state contradicted the optimistic status; server wins
    ConflictDetected {
        job_id: JobId,
        server_status: JobStatus,
        local_status: JobStatus,
    },
}

/// Broadcast hub for [`SyncEvent`]s
#[derive(Debug, Clone)]
pub struct SyncEvents {
    tx: broadcast::Sender<SyncEvent>,
}

impl Default for SyncEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Publish an event; returns how many subscribers received it
    pub fn emit(&self, event: SyncEvent) -> usize {
        tracing::debug!("[Sync] event {:?}", event);
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Forward every event to `listener` on a background task
    pub fn listen<F>(&self, listener: F) -> SyncListenerHandle
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let mut rx = self.subscribe();
        let listener = Arc::new(listener);
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => listener(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("[Sync] listener lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        SyncListenerHandle { task }
    }
}

/// Keeps a sync listener alive; dropping it unsubscribes
#[derive(Debug)]
pub struct SyncListenerHandle {
    task: JoinHandle<()>,
}

impl SyncListenerHandle {
    pub fn unsubscribe(self) {}
}

impl Drop for SyncListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Snapshot of the queue for status displays
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub is_syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub pending_operations: usize,
    pub dead_letters: usize,
    pub network_status: NetworkStatus,
    pub awaiting_credentials: bool,
    pub last_error: Option<String>,
}

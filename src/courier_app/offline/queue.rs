//! # Action Queue
//!
//! Decides, for every courier action, whether it can go to the server now or
//! has to wait, and replays waiting actions once connectivity returns.
//!
//! ## Features
//!
//! - **Write-ahead**: every action is persisted before its first network attempt,
//!   so a crash mid-request never loses it
//! - **Serial Drain**: the store is replayed strictly oldest first, one request at a time
//! - **Failure Isolation**: a refused action is dead-lettered and the drain moves on;
//!   a transient failure stops the drain so nothing overtakes it
//! - **Reentrancy Guard**: a drain requested while one is running is coalesced
//!
//! ## Usage
//!
//! ```rust,no_run
//! use courier_sync::courier_app::offline::ActionQueueManager;
//! use courier_sync::shared::{CourierAction, JobStatus};
//!
//! # async fn example(manager: ActionQueueManager) -> Result<(), Box<dyn std::error::Error>> {
//! manager.submit("J1", CourierAction::AcceptJob).await?;
//! manager
//!     .submit("J1", CourierAction::UpdateStatus { status: JobStatus::PickedUp, reason: None })
//!     .await?;
//!
//! // After reconnecting
//! let report = manager.drain().await;
//! println!("{} sent, {} still queued", report.sent, report.remaining);
//! # Ok(())
//! # }
//! ```

use crate::courier_app::api_client::{ApiError, FailureClass, JobsApi};
use crate::courier_app::local_db::{ActionPatch, DeadLetter, DeadLetterReason, LocalActionStore, StoreError};
use crate::courier_app::offline::optimistic::{JobBoard, JobView};
use crate::courier_app::offline::reconciliation::{ReconciliationResult, StatusReconciler};
use crate::courier_app::offline::retry::RetryPolicy;
use crate::courier_app::sync::network_monitor::ConnectivityMonitor;
use crate::courier_app::sync::sync_state::{SyncEvent, SyncEvents, SyncListenerHandle, SyncState};
use crate::shared::{
    ActionKind, AppConfig, CourierAction, DeliveryJob, JobId, JobStatus, PendingAction, SharedError,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Errors surfaced to callers of the queue
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Invalid(#[from] SharedError),

    #[error("unknown job {0}")]
    UnknownJob(JobId),

    #[error("a {kind} for job {job_id} is already queued")]
    Duplicate {
        job_id: JobId,
        kind: ActionKind,
        existing: Uuid,
    },

    #[error("job {job_id} is already {status}")]
    AlreadyApplied { job_id: JobId, status: JobStatus },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Why a submitted action was left in the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueReason {
    Offline,
    /// Earlier actions are still waiting
    Backlog,
    /// The send failed with a retryable error
    NetworkError(String),
    AwaitingCredentials,
    /// Another drain is running and will pick the action up
    DrainInProgress,
}

/// Result of [`ActionQueueManager::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Confirmed by the server; nothing left queued
    Sent,
    /// Persisted for a later drain
    Queued { reason: QueueReason },
    /// An identical transition is already queued
    Coalesced { existing: Uuid },
    /// The job already shows the requested status
    Unchanged,
    /// Refused by the server and dead-lettered
    Rejected { reason: String },
}

/// Why a drain pass stopped before emptying the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Offline,
    AwaitingCredentials,
    /// Retryable failure; remaining actions wait for the backoff
    Retryable(String),
    Storage(String),
}

/// Summary of a drain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub sent: usize,
    pub dead_lettered: usize,
    /// Actions still queued afterwards
    pub remaining: usize,
    pub stopped: Option<StopReason>,
    /// When the caller should try again
    pub retry_after: Option<Duration>,
    /// Another drain was already running; nothing was done
    pub coalesced: bool,
}

impl DrainReport {
    fn coalesced() -> Self {
        Self {
            coalesced: true,
            ..Default::default()
        }
    }

    /// Everything that was queued has been dealt with
    pub fn is_complete(&self) -> bool {
        !self.coalesced && self.remaining == 0
    }
}

/// Resets the draining flag even if the drain future is dropped
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct SyncStats {
    last_sync: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

struct QueueInner {
    api: Arc<dyn JobsApi>,
    store: Arc<LocalActionStore>,
    connectivity: ConnectivityMonitor,
    board: RwLock<JobBoard>,
    reconciler: StatusReconciler,
    retry: RetryPolicy,
    events: SyncEvents,
    draining: AtomicBool,
    /// Held by drain passes and refreshes so they never interleave
    sync_lock: tokio::sync::Mutex<()>,
    auth_blocked: AtomicBool,
    stats: Mutex<SyncStats>,
}

/// Offline-first courier action queue
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct ActionQueueManager {
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for ActionQueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionQueueManager")
            .field("draining", &self.inner.draining.load(Ordering::SeqCst))
            .field("auth_blocked", &self.inner.auth_blocked.load(Ordering::SeqCst))
            .field("connectivity", &self.inner.connectivity)
            .finish_non_exhaustive()
    }
}

impl ActionQueueManager {
    pub fn new(
        api: Arc<dyn JobsApi>,
        store: Arc<LocalActionStore>,
        connectivity: ConnectivityMonitor,
        config: &AppConfig,
    ) -> Self {
        Self::with_retry_policy(api, store, connectivity, RetryPolicy::from_config(config))
    }

    pub fn with_retry_policy(
        api: Arc<dyn JobsApi>,
        store: Arc<LocalActionStore>,
        connectivity: ConnectivityMonitor,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                api,
                store,
                connectivity,
                board: RwLock::new(JobBoard::new()),
                reconciler: StatusReconciler::new(),
                retry,
                events: SyncEvents::new(),
                draining: AtomicBool::new(false),
                sync_lock: tokio::sync::Mutex::new(()),
                auth_blocked: AtomicBool::new(false),
                stats: Mutex::new(SyncStats::default()),
            }),
        }
    }

    fn board(&self) -> RwLockReadGuard<'_, JobBoard> {
        match self.inner.board.read() {
            Ok(board) => board,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn board_mut(&self) -> RwLockWriteGuard<'_, JobBoard> {
        match self.inner.board.write() {
            Ok(board) => board,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn with_stats<R>(&self, f: impl FnOnce(&mut SyncStats) -> R) -> R {
        match self.inner.stats.lock() {
            Ok(mut stats) => f(&mut stats),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.inner.connectivity
    }

    pub fn store(&self) -> &Arc<LocalActionStore> {
        &self.inner.store
    }

    /// Seed the board with a job list, re-applying persisted actions
    pub async fn load_jobs(&self, jobs: Vec<DeliveryJob>) {
        let pending = self.inner.store.list().await;
        self.board_mut().load(jobs, &pending);
    }

    /// Jobs as the courier should see them
    pub fn jobs(&self) -> Vec<JobView> {
        self.board().views()
    }

    pub fn job(&self, job_id: &JobId) -> Option<JobView> {
        self.board().view(job_id)
    }

    /// Validate `action` and apply its optimistic effect.
    ///
    /// Nothing is persisted until [`PreparedAction::commit`]; until then the
    /// action can still be cancelled.
    pub fn prepare(
        &self,
        job_id: impl Into<JobId>,
        action: CourierAction,
    ) -> Result<PreparedAction, QueueError> {
        action.validate()?;
        let pending = PendingAction::new(job_id, action);

        let mut board = self.board_mut();
        let entry = board
            .get(&pending.job_id)
            .ok_or_else(|| QueueError::UnknownJob(pending.job_id.clone()))?;

        let key = pending.transition_key();
        if let Some(existing) = entry.pending.iter().find(|a| a.transition_key() == key) {
            return Err(QueueError::Duplicate {
                job_id: pending.job_id.clone(),
                kind: pending.kind(),
                existing: existing.id,
            });
        }
        if let Some(target) = pending.target_status() {
            if target == entry.local_status {
                return Err(QueueError::AlreadyApplied {
                    job_id: pending.job_id.clone(),
                    status: target,
                });
            }
        }

        board.apply_optimistic(&pending)?;
        drop(board);

        tracing::debug!(
            "[Queue] optimistic {} for job {} ({})",
            pending.kind(),
            pending.job_id,
            pending.id
        );
        Ok(PreparedAction {
            manager: self.clone(),
            action: pending,
            armed: true,
        })
    }

    /// Apply, persist and (when online) send one action
    pub async fn submit(
        &self,
        job_id: impl Into<JobId>,
        action: CourierAction,
    ) -> Result<SubmitOutcome, QueueError> {
        match self.prepare(job_id, action) {
            Ok(prepared) => prepared.commit().await,
            Err(QueueError::Duplicate { existing, .. }) => Ok(SubmitOutcome::Coalesced { existing }),
            Err(QueueError::AlreadyApplied { .. }) => Ok(SubmitOutcome::Unchanged),
            Err(e) => Err(e),
        }
    }

    /// Fire-and-forget submission: returns once the optimistic update is
    /// visible; persistence and sending continue on a spawned task.
    pub fn submit_action(
        &self,
        job_id: impl Into<JobId>,
        action: CourierAction,
    ) -> Result<JoinHandle<Result<SubmitOutcome, QueueError>>, QueueError> {
        let prepared = self.prepare(job_id, action)?;
        Ok(tokio::spawn(prepared.commit()))
    }

    async fn commit(&self, action: PendingAction) -> Result<SubmitOutcome, QueueError> {
        let appended = match self.inner.store.append(action.clone()).await {
            Ok(appended) => appended,
            Err(StoreError::Duplicate { existing }) => {
                self.board_mut().forget(&action.job_id, action.id);
                return Ok(SubmitOutcome::Coalesced { existing });
            }
            Err(err) => {
                self.board_mut().forget(&action.job_id, action.id);
                if let StoreError::QuotaExceeded { .. } = err {
                    tracing::warn!("[Queue] storage full, {} for job {} not queued", action.kind(), action.job_id);
                    self.inner.events.emit(SyncEvent::StorageWarning {
                        evicted: Vec::new(),
                        message: format!("Storage is full: could not save {} for job {}", action.kind(), action.job_id),
                    });
                }
                return Err(err.into());
            }
        };

        {
            let mut board = self.board_mut();
            board.attach_pending(std::slice::from_ref(&appended.action));
            for evicted in &appended.evicted {
                board.forget(&evicted.job_id, evicted.id);
            }
        }
        if !appended.evicted.is_empty() {
            self.inner.events.emit(SyncEvent::StorageWarning {
                evicted: appended.evicted.iter().map(|a| a.id).collect(),
                message: format!(
                    "Storage is full: dropped {} older queued action(s)",
                    appended.evicted.len()
                ),
            });
        }

        if !self.inner.connectivity.can_drain() {
            tracing::info!("[Queue] offline, queued {} for job {}", action.kind(), action.job_id);
            return Ok(SubmitOutcome::Queued {
                reason: QueueReason::Offline,
            });
        }
        if self.inner.auth_blocked.load(Ordering::SeqCst) {
            return Ok(SubmitOutcome::Queued {
                reason: QueueReason::AwaitingCredentials,
            });
        }

        let report = self.drain().await;
        if report.coalesced {
            return Ok(SubmitOutcome::Queued {
                reason: QueueReason::DrainInProgress,
            });
        }
        if self.inner.store.get(action.id).await.is_some() {
            let reason = match report.stopped {
                Some(StopReason::Offline) => QueueReason::Offline,
                Some(StopReason::AwaitingCredentials) => QueueReason::AwaitingCredentials,
                Some(StopReason::Retryable(message)) | Some(StopReason::Storage(message)) => {
                    QueueReason::NetworkError(message)
                }
                None => QueueReason::Backlog,
            };
            return Ok(SubmitOutcome::Queued { reason });
        }
        let dead = self
            .inner
            .store
            .dead_letters()
            .await
            .into_iter()
            .find(|d| d.action.id == action.id);
        Ok(match dead {
            Some(dead) => SubmitOutcome::Rejected {
                reason: dead.message,
            },
            None => SubmitOutcome::Sent,
        })
    }

    /// Replay the store oldest first, one action at a time.
    ///
    /// Returns a coalesced report when another drain is already running.
    pub async fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        let mut first = true;
        loop {
            let Some(guard) = DrainGuard::acquire(&self.inner.draining) else {
                if first {
                    tracing::debug!("[Queue] drain already in progress");
                    return DrainReport::coalesced();
                }
                break;
            };
            first = false;
            self.drain_pass(&mut report).await;
            drop(guard);

            // An action appended just as the pass finished saw the flag still set
            // and left it to us.
            if report.stopped.is_some() || self.inner.store.is_empty().await || !self.can_send() {
                break;
            }
        }
        report
    }

    fn can_send(&self) -> bool {
        self.inner.connectivity.can_drain() && !self.inner.auth_blocked.load(Ordering::SeqCst)
    }

    async fn drain_pass(&self, report: &mut DrainReport) {
        let _sync = self.inner.sync_lock.lock().await;

        let pending = self.inner.store.len().await;
        if pending == 0 {
            report.remaining = 0;
            return;
        }
        if !self.inner.connectivity.can_drain() {
            report.stopped = Some(StopReason::Offline);
            report.remaining = pending;
            return;
        }
        if self.inner.auth_blocked.load(Ordering::SeqCst) {
            report.stopped = Some(StopReason::AwaitingCredentials);
            report.remaining = pending;
            return;
        }

        tracing::info!("[Queue] draining {} pending actions", pending);
        self.inner.events.emit(SyncEvent::DrainStarted { pending });
        let sent_before = report.sent;
        let dead_before = report.dead_lettered;

        loop {
            if !self.inner.connectivity.can_drain() {
                report.stopped = Some(StopReason::Offline);
                break;
            }
            let Some(action) = self.inner.store.front().await else {
                break;
            };

            tracing::debug!(
                "[Queue] sending {} for job {} (attempt {})",
                action.kind(),
                action.job_id,
                action.attempts + 1
            );
            match self.inner.api.send_action(&action).await {
                Ok(server_job) => {
                    if let Err(e) = self.inner.store.remove(action.id).await {
                        tracing::error!("[Queue] could not remove confirmed action {}: {}", action.id, e);
                        report.stopped = Some(StopReason::Storage(e.to_string()));
                        break;
                    }
                    self.inner
                        .reconciler
                        .confirm(&mut self.board_mut(), &action, server_job);
                    report.sent += 1;
                }
                Err(err) => {
                    if let Some(stop) = self.handle_failure(&action, err, report).await {
                        report.stopped = Some(stop);
                        break;
                    }
                }
            }
        }

        report.remaining = self.inner.store.len().await;
        let sent = report.sent - sent_before;
        let dead_lettered = report.dead_lettered - dead_before;
        self.with_stats(|stats| {
            if sent > 0 || report.stopped.is_none() {
                stats.last_sync = Some(Utc::now());
            }
            stats.last_error = match &report.stopped {
                Some(StopReason::Retryable(message)) | Some(StopReason::Storage(message)) => {
                    Some(message.clone())
                }
                _ => None,
            };
        });

        tracing::info!(
            "[Queue] drain finished: {} sent, {} dead-lettered, {} remaining",
            sent,
            dead_lettered,
            report.remaining
        );
        self.inner.events.emit(SyncEvent::DrainFinished {
            sent,
            remaining: report.remaining,
            dead_lettered,
        });
    }

    /// Returns a stop reason when the drain must not continue
    async fn handle_failure(
        &self,
        action: &PendingAction,
        err: ApiError,
        report: &mut DrainReport,
    ) -> Option<StopReason> {
        let attempts = action.attempts + 1;
        match err.class() {
            FailureClass::Retryable => {
                let counted = self.failure_counts(&err).await;
                if counted && self.inner.retry.exhausted(attempts) {
                    let message = format!("retries exhausted after {} attempts: {}", attempts, err);
                    return self
                        .give_up(action, attempts, DeadLetterReason::RetriesExhausted, message, report)
                        .await;
                }
                let patch = if counted {
                    ActionPatch::failed_attempt(attempts, err.to_string())
                } else {
                    tracing::debug!("[Queue] backend unreachable, attempt not counted");
                    ActionPatch::uncounted_failure(err.to_string())
                };
                if let Err(e) = self.inner.store.update(action.id, patch).await {
                    tracing::error!("[Queue] could not record attempt for {}: {}", action.id, e);
                    return Some(StopReason::Storage(e.to_string()));
                }
                let delay = self
                    .inner
                    .retry
                    .delay_for(if counted { attempts } else { action.attempts.max(1) });
                tracing::warn!(
                    "[Queue] {} for job {} failed ({}), retrying in {:?}",
                    action.kind(),
                    action.job_id,
                    err,
                    delay
                );
                report.retry_after = Some(delay);
                Some(StopReason::Retryable(err.to_string()))
            }
            FailureClass::Auth => {
                tracing::warn!("[Queue] credentials refused, pausing drain");
                self.inner.auth_blocked.store(true, Ordering::SeqCst);
                self.inner.events.emit(SyncEvent::AuthRequired {
                    status: err.status().unwrap_or(401),
                });
                Some(StopReason::AwaitingCredentials)
            }
            FailureClass::Rejected => {
                let reason = DeadLetterReason::Rejected { status: err.status() };
                let message = match &err {
                    ApiError::Rejected { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                self.give_up(action, attempts, reason, message, report).await
            }
        }
    }

    /// Transport failures only count against the attempt ceiling while the
    /// backend is known to be reachable.
    async fn failure_counts(&self, err: &ApiError) -> bool {
        if !matches!(err, ApiError::Network(_) | ApiError::Timeout) {
            return true;
        }
        let connectivity = &self.inner.connectivity;
        if !connectivity.can_drain() {
            return false;
        }
        connectivity.force_check().await.is_online() && connectivity.can_drain()
    }

    async fn give_up(
        &self,
        action: &PendingAction,
        attempts: u32,
        reason: DeadLetterReason,
        message: String,
        report: &mut DrainReport,
    ) -> Option<StopReason> {
        let stored = match self
            .inner
            .store
            .update(action.id, ActionPatch::failed_attempt(attempts, message.clone()))
            .await
        {
            Ok(_) => self.inner.store.dead_letter(action.id, reason, message.clone()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            tracing::error!("[Queue] could not dead-letter {}: {}", action.id, e);
            return Some(StopReason::Storage(e.to_string()));
        }

        tracing::warn!(
            "[Queue] {} for job {} dead-lettered: {}",
            action.kind(),
            action.job_id,
            message
        );
        self.inner
            .reconciler
            .reject(&mut self.board_mut(), action, &message);
        self.inner.events.emit(SyncEvent::ActionDeadLettered {
            action_id: action.id,
            job_id: action.job_id.clone(),
            kind: action.kind(),
            reason: message,
        });
        report.dead_lettered += 1;
        None
    }

    /// Fetch the job list and reconcile it with the optimistic state
    pub async fn refresh(&self) -> Result<ReconciliationResult, QueueError> {
        let _sync = self.inner.sync_lock.lock().await;

        let jobs = match self.inner.api.fetch_jobs().await {
            Ok(jobs) => jobs,
            Err(err) => {
                if err.class() == FailureClass::Auth {
                    self.inner.auth_blocked.store(true, Ordering::SeqCst);
                    self.inner.events.emit(SyncEvent::AuthRequired {
                        status: err.status().unwrap_or(401),
                    });
                }
                self.with_stats(|stats| stats.last_error = Some(err.to_string()));
                return Err(err.into());
            }
        };

        let pending = self.inner.store.list().await;
        let result = {
            let mut board = self.board_mut();
            for job in &jobs {
                if !board.contains(&job.id) {
                    board.upsert_server_job(job.clone());
                }
            }
            board.attach_pending(&pending);
            self.inner.reconciler.reconcile_refresh(&mut board, jobs)
        };

        for conflict in &result.conflicts {
            for id in &conflict.actions {
                let message = format!(
                    "job {} is already {} on the server",
                    conflict.job_id, conflict.server_status
                );
                let reason = DeadLetterReason::Conflict {
                    server_status: conflict.server_status,
                };
                if let Some(dead) = self.inner.store.dead_letter(*id, reason, message.clone()).await? {
                    self.inner.events.emit(SyncEvent::ActionDeadLettered {
                        action_id: dead.action.id,
                        job_id: dead.action.job_id.clone(),
                        kind: dead.action.kind(),
                        reason: message,
                    });
                }
            }
            self.inner.events.emit(SyncEvent::ConflictDetected {
                job_id: conflict.job_id.clone(),
                server_status: conflict.server_status,
                local_status: conflict.local_status,
            });
        }
        for id in &result.superseded {
            self.inner.store.remove(*id).await?;
        }

        tracing::info!(
            "[Queue] refreshed {} jobs ({} conflicts, {} superseded actions)",
            result.refreshed,
            result.conflicts.len(),
            result.superseded.len()
        );
        Ok(result)
    }

    /// Install a fresh credential and resume draining
    pub async fn set_credentials(&self, token: impl Into<String>) -> DrainReport {
        self.inner.api.set_token(Some(token.into()));
        self.inner.auth_blocked.store(false, Ordering::SeqCst);
        tracing::info!("[Queue] credentials updated, resuming sync");
        self.drain().await
    }

    pub fn awaiting_credentials(&self) -> bool {
        self.inner.auth_blocked.load(Ordering::SeqCst)
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    /// Number of queued actions, for badges
    pub async fn pending_count(&self) -> usize {
        self.inner.store.len().await
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.store.dead_letters().await
    }

    pub async fn dismiss_dead_letter(&self, id: Uuid) -> Result<Option<DeadLetter>, QueueError> {
        Ok(self.inner.store.dismiss_dead_letter(id).await?)
    }

    /// Drop every queued action and optimistic state. Recovery use only.
    pub async fn reset_queue(&self) -> Result<(), QueueError> {
        let _sync = self.inner.sync_lock.lock().await;
        self.inner.store.clear_all().await?;

        let mut board = self.board_mut();
        let confirmed: Vec<DeliveryJob> = board
            .job_ids()
            .iter()
            .filter_map(|id| board.get(id).map(|entry| entry.job.clone()))
            .collect();
        board.load(confirmed, &[]);
        Ok(())
    }

    /// Listen for drain start/finish, dead-letters and other sync notices
    pub fn on_sync_status_change<F>(&self, listener: F) -> SyncListenerHandle
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.inner.events.listen(listener)
    }

    pub fn sync_events(&self) -> &SyncEvents {
        &self.inner.events
    }

    pub async fn status(&self) -> SyncState {
        let (last_sync, last_error) =
            self.with_stats(|stats| (stats.last_sync, stats.last_error.clone()));
        SyncState {
            is_syncing: self.is_draining(),
            last_sync,
            pending_operations: self.inner.store.len().await,
            dead_letters: self.inner.store.dead_letters().await.len(),
            network_status: self.inner.connectivity.current_status(),
            awaiting_credentials: self.awaiting_credentials(),
            last_error,
        }
    }
}

/// An action whose optimistic effect is visible but which is not persisted yet.
///
/// Dropping it without [`commit`](Self::commit) rolls the optimistic update back.
#[derive(Debug)]
pub struct PreparedAction {
    manager: ActionQueueManager,
    action: PendingAction,
    armed: bool,
}

impl PreparedAction {
    pub fn action(&self) -> &PendingAction {
        &self.action
    }

    /// Cancel before the action is persisted
    pub fn cancel(mut self) {
        self.rollback();
    }

    /// Persist the action and send it when online
    pub async fn commit(mut self) -> Result<SubmitOutcome, QueueError> {
        self.armed = false;
        let action = self.action.clone();
        self.manager.commit(action).await
    }

    fn rollback(&mut self) {
        if self.armed {
            self.armed = false;
            tracing::debug!("[Queue] cancelled {} for job {}", self.action.kind(), self.action.job_id);
            self.manager
                .board_mut()
                .forget(&self.action.job_id, self.action.id);
        }
    }
}

impl Drop for PreparedAction {
    fn drop(&mut self) {
        self.rollback();
    }
}

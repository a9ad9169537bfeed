//! # State Reconciliation
//!
//! Merges a fresh server job list into the optimistic board after an offline
//! period.
//!
//! ## Features
//!
//! - **State Comparison**: compare the optimistic status with the server's
//! - **Conflict Detection**: a terminal server state that contradicts queued
//!   actions is a conflict; the server wins
//! - **Automatic Merging**: pending actions the server has already moved past
//!   are dropped as superseded
//!
//! ## Usage
//!
//! ```rust,no_run
//! use courier_sync::courier_app::offline::{JobBoard, StatusReconciler};
//!
//! # fn example(board: &mut JobBoard, server_jobs: Vec<courier_sync::shared::DeliveryJob>) {
//! let result = StatusReconciler::new().reconcile_refresh(board, server_jobs);
//! for conflict in &result.conflicts {
//!     println!("{} is {} on the server", conflict.job_id, conflict.server_status);
//! }
//! # }
//! ```

use crate::courier_app::offline::optimistic::JobBoard;
use crate::shared::{CourierAction, DeliveryJob, JobId, JobStatus, PendingAction};
use std::collections::HashSet;
use uuid::Uuid;

/// Outcome of merging one job's status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMerge {
    /// Server status stands
    Server,
    /// Optimistic status is ahead of the server and stays
    Local,
    /// Server reached a terminal state the queued actions contradict
    Conflict,
}

/// Decide which status a job shows after a refresh
pub fn merge_status(local: JobStatus, server: JobStatus, has_pending: bool) -> StatusMerge {
    if !has_pending || local == server {
        return StatusMerge::Server;
    }
    if server.is_terminal() {
        return StatusMerge::Conflict;
    }
    if local.rank() > server.rank() {
        StatusMerge::Local
    } else {
        StatusMerge::Server
    }
}

/// Whether a queued action targeting `target` is already covered by `server`.
/// A terminal target is only covered by that same terminal status.
pub fn is_superseded(target: JobStatus, server: JobStatus) -> bool {
    target == server || (!target.is_terminal() && target.rank() < server.rank())
}

/// A job whose queued actions were overruled by the server
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationConflict {
    pub job_id: JobId,
    pub server_status: JobStatus,
    pub local_status: JobStatus,
    /// Pending actions that can no longer be applied
    pub actions: Vec<Uuid>,
}

/// Result of reconciliation process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationResult {
    /// Jobs present in the server list
    pub refreshed: usize,
    pub conflicts: Vec<ReconciliationConflict>,
    /// Pending actions the server state already covers
    pub superseded: Vec<Uuid>,
    /// Jobs dropped because the server no longer lists them
    pub removed: Vec<JobId>,
}

impl ReconciliationResult {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Applies server job lists to a [`JobBoard`]
#[derive(Debug, Default, Clone)]
pub struct StatusReconciler;

impl StatusReconciler {
    pub fn new() -> Self {
        Self
    }

    /// A replayed action succeeded; fold the server's answer into the board
    pub fn confirm(&self, board: &mut JobBoard, action: &PendingAction, server_job: Option<DeliveryJob>) {
        if let (Some(job), Some(target)) = (&server_job, action.target_status()) {
            if job.status != target {
                tracing::debug!(
                    "[Reconcile] {} for job {} confirmed with server status {}",
                    action.kind(),
                    action.job_id,
                    job.status
                );
            }
        }
        board.confirm(action, server_job);
    }

    /// The server refused an action; roll its optimistic effect back and flag it
    pub fn reject(&self, board: &mut JobBoard, action: &PendingAction, reason: &str) {
        board.reject(action, format!("{} was rejected: {}", action.kind(), reason));
    }

    /// Merge a full server job list
    pub fn reconcile_refresh(
        &self,
        board: &mut JobBoard,
        server_jobs: Vec<DeliveryJob>,
    ) -> ReconciliationResult {
        let mut result = ReconciliationResult {
            refreshed: server_jobs.len(),
            ..Default::default()
        };
        let listed: HashSet<JobId> = server_jobs.iter().map(|job| job.id.clone()).collect();

        for job in server_jobs {
            let Some(entry) = board.get(&job.id) else {
                board.upsert_server_job(job);
                continue;
            };

            let local = entry.local_status;
            let server = job.status;
            match merge_status(local, server, entry.has_pending()) {
                StatusMerge::Conflict => {
                    let actions: Vec<Uuid> = entry.pending.iter().map(|a| a.id).collect();
                    tracing::warn!(
                        "[Reconcile] job {} is {} on the server, discarding {} local actions (local {})",
                        job.id,
                        server,
                        actions.len(),
                        local
                    );
                    result.conflicts.push(ReconciliationConflict {
                        job_id: job.id.clone(),
                        server_status: server,
                        local_status: local,
                        actions,
                    });
                    board.override_with_server(job, format!("job is already {} on the server", server));
                }
                StatusMerge::Local | StatusMerge::Server => {
                    // Actions whose target the server has reached or passed
                    // would only be refused on replay.
                    let superseded: Vec<Uuid> = entry
                        .pending
                        .iter()
                        .filter(|action| match action.target_status() {
                            Some(target) => is_superseded(target, server),
                            None => matches!(action.action, CourierAction::RejectJob { .. })
                                && server != JobStatus::Available,
                        })
                        .map(|action| action.id)
                        .collect();
                    let job_id = job.id.clone();
                    board.upsert_server_job(job);
                    for id in &superseded {
                        board.forget(&job_id, *id);
                    }
                    result.superseded.extend(superseded);
                }
            }
        }

        for job_id in board.job_ids() {
            if listed.contains(&job_id) {
                continue;
            }
            let keep = board.get(&job_id).map(|e| e.has_pending()).unwrap_or(false);
            if !keep {
                board.remove_job(&job_id);
                result.removed.push(job_id);
            }
        }

        result
    }
}

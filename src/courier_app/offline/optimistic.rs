//! # Optimistic UI Updates
//!
//! Keeps the courier's job list showing the effect of every queued action
//! before the server has confirmed it.
//!
//! ## Features
//!
//! - **Immediate UI Updates**: a submitted action changes the displayed status at once
//! - **Rollback Support**: a refused action reverts to the confirmed state
//! - **Confirmation**: a server echo replaces the optimistic state
//! - **State Tracking**: each job remembers its unconfirmed actions
//!
//! The displayed status of a job is always its confirmed status with the
//! pending actions replayed on top, in queue order.

use crate::shared::{CourierAction, DeliveryJob, JobId, JobStatus, PendingAction, SharedError};
use std::collections::HashMap;
use uuid::Uuid;

/// One job as the board tracks it
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedJob {
    /// Latest server data; `job.status` is the confirmed status
    pub job: DeliveryJob,
    /// Unconfirmed actions for this job, in queue order
    pub pending: Vec<PendingAction>,
    /// Status after replaying `pending`
    pub local_status: JobStatus,
    /// A pending rejection removes the job from the courier's list
    pub hidden: bool,
    /// Notice about the last refused or conflicting action
    pub conflict: Option<String>,
}

impl TrackedJob {
    fn new(job: DeliveryJob) -> Self {
        let local_status = job.status;
        Self {
            job,
            pending: Vec::new(),
            local_status,
            hidden: false,
            conflict: None,
        }
    }

    pub fn confirmed_status(&self) -> JobStatus {
        self.job.status
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn recompute(&mut self) {
        let mut status = self.job.status;
        let mut hidden = false;
        for action in &self.pending {
            if let CourierAction::RejectJob { .. } = action.action {
                hidden = true;
            }
            if let Some(target) = action.target_status() {
                if status.can_transition_to(target) {
                    status = target;
                }
            }
        }
        self.local_status = status;
        self.hidden = hidden;
    }
}

/// What the UI renders for one job
#[derive(Debug, Clone, PartialEq)]
pub struct JobView {
    /// Job data carrying the optimistic status
    pub job: DeliveryJob,
    pub confirmed_status: JobStatus,
    pub pending_actions: usize,
    pub conflict: Option<String>,
}

/// Optimistic job state keyed by job id
#[derive(Debug, Default)]
pub struct JobBoard {
    jobs: HashMap<JobId, TrackedJob>,
    order: Vec<JobId>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the board with a fresh server list and re-apply `pending`
    pub fn load(&mut self, jobs: Vec<DeliveryJob>, pending: &[PendingAction]) {
        self.jobs.clear();
        self.order.clear();
        for job in jobs {
            self.upsert_server_job(job);
        }
        for action in pending {
            if let Some(entry) = self.jobs.get_mut(&action.job_id) {
                entry.pending.push(action.clone());
            }
        }
        for entry in self.jobs.values_mut() {
            entry.recompute();
        }
    }

    /// Insert or refresh server data, keeping pending actions
    pub fn upsert_server_job(&mut self, job: DeliveryJob) {
        match self.jobs.get_mut(&job.id) {
            Some(entry) => {
                entry.job = job;
                entry.recompute();
            }
            None => {
                self.order.push(job.id.clone());
                self.jobs.insert(job.id.clone(), TrackedJob::new(job));
            }
        }
    }

    pub fn remove_job(&mut self, job_id: &JobId) -> Option<TrackedJob> {
        self.order.retain(|id| id != job_id);
        self.jobs.remove(job_id)
    }

    pub fn get(&self, job_id: &JobId) -> Option<&TrackedJob> {
        self.jobs.get(job_id)
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.jobs.contains_key(job_id)
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        self.order.clone()
    }

    /// Jobs the courier should see, in server order
    pub fn views(&self) -> Vec<JobView> {
        self.order
            .iter()
            .filter_map(|id| self.jobs.get(id))
            .filter(|entry| !entry.hidden)
            .map(Self::view_of)
            .collect()
    }

    pub fn view(&self, job_id: &JobId) -> Option<JobView> {
        self.jobs.get(job_id).map(Self::view_of)
    }

    fn view_of(entry: &TrackedJob) -> JobView {
        let mut job = entry.job.clone();
        job.status = entry.local_status;
        JobView {
            job,
            confirmed_status: entry.job.status,
            pending_actions: entry.pending.len(),
            conflict: entry.conflict.clone(),
        }
    }

    /// Validate `action` against the displayed status and apply it
    pub fn apply_optimistic(&mut self, action: &PendingAction) -> Result<(), SharedError> {
        let entry = self
            .jobs
            .get_mut(&action.job_id)
            .ok_or_else(|| SharedError::validation("job_id", format!("unknown job {}", action.job_id)))?;

        match (&action.action, action.target_status()) {
            (CourierAction::RejectJob { .. }, _) => {
                if entry.local_status != JobStatus::Available || entry.hidden {
                    return Err(SharedError::transition(entry.local_status, JobStatus::Available));
                }
            }
            (_, Some(target)) => {
                if target == entry.local_status {
                    return Err(SharedError::transition(entry.local_status, target));
                }
                entry.local_status.advance(target)?;
            }
            (_, None) => {}
        }

        entry.pending.push(action.clone());
        entry.conflict = None;
        entry.recompute();
        Ok(())
    }

    /// Track persisted actions the board does not know about yet, e.g. after a
    /// restart. Actions not yet persisted (sequence 0) stay last.
    pub fn attach_pending(&mut self, actions: &[PendingAction]) {
        for action in actions {
            let Some(entry) = self.jobs.get_mut(&action.job_id) else {
                continue;
            };
            match entry.pending.iter_mut().find(|a| a.id == action.id) {
                Some(known) => known.sequence = action.sequence,
                None => entry.pending.push(action.clone()),
            }
        }
        for entry in self.jobs.values_mut() {
            entry.pending.sort_by_key(|a| (a.sequence == 0, a.sequence));
            entry.recompute();
        }
    }

    /// Drop one pending action without touching the confirmed state.
    /// Used to undo an optimistic update that never reached the queue.
    pub fn forget(&mut self, job_id: &JobId, action_id: Uuid) {
        if let Some(entry) = self.jobs.get_mut(job_id) {
            entry.pending.retain(|a| a.id != action_id);
            entry.recompute();
        }
    }

    /// The server accepted `action`; adopt its echo or the action's target
    pub fn confirm(&mut self, action: &PendingAction, server_job: Option<DeliveryJob>) {
        let Some(entry) = self.jobs.get_mut(&action.job_id) else {
            return;
        };
        entry.pending.retain(|a| a.id != action.id);

        if let CourierAction::RejectJob { .. } = action.action {
            // The job leaves the courier's list for good
            self.remove_job(&action.job_id);
            return;
        }

        match server_job {
            Some(job) if job.id == action.job_id => entry.job = job,
            _ => {
                // Never move a confirmed status backwards
                if let Some(target) = action.target_status() {
                    if entry.job.status.can_transition_to(target) {
                        entry.job.status = target;
                    }
                }
            }
        }
        entry.recompute();
    }

    /// The server refused `action`; revert its optimistic effect
    pub fn reject(&mut self, action: &PendingAction, message: impl Into<String>) {
        if let Some(entry) = self.jobs.get_mut(&action.job_id) {
            entry.pending.retain(|a| a.id != action.id);
            entry.conflict = Some(message.into());
            entry.recompute();
        }
    }

    /// Server state wins: drop every pending action and adopt `job`
    pub fn override_with_server(&mut self, job: DeliveryJob, message: impl Into<String>) {
        let job_id = job.id.clone();
        self.upsert_server_job(job);
        if let Some(entry) = self.jobs.get_mut(&job_id) {
            entry.pending.clear();
            entry.conflict = Some(message.into());
            entry.recompute();
        }
    }
}

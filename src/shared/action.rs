//! # Courier Actions
//!
//! A courier action is one user-initiated state change on a delivery job.
//! Actions that the server has not confirmed yet are kept as
//! [`PendingAction`] records so they can be replayed later.
//!
//! ## Kinds
//!
//! | Kind | Target status |
//! |------|---------------|
//! | accept-job | accepted |
//! | reject-job | none (job leaves the courier's board) |
//! | update-status | picked_up, in_transit or out_for_delivery |
//! | submit-delivery-proof | delivered |
//! | submit-failure-report | failed |
//! | return-to-supplier | returned |

use crate::shared::error::SharedError;
use crate::shared::job::{JobId, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Action kind, used for logging, priorities and duplicate detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    AcceptJob,
    RejectJob,
    UpdateStatus,
    SubmitDeliveryProof,
    SubmitFailureReport,
    ReturnToSupplier,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::AcceptJob => "accept-job",
            ActionKind::RejectJob => "reject-job",
            ActionKind::UpdateStatus => "update-status",
            ActionKind::SubmitDeliveryProof => "submit-delivery-proof",
            ActionKind::SubmitFailureReport => "submit-failure-report",
            ActionKind::ReturnToSupplier => "return-to-supplier",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Eviction priority of a queued action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Cheap to redo (accepting or rejecting a job)
    Low,
    /// Status updates
    Normal,
    /// Failure evidence
    High,
    /// Delivery proof, never evicted
    Critical,
}

/// Captured photo awaiting upload, owned by exactly one pending action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaReference {
    pub id: Uuid,
    /// Owning action, filled in when the action is recorded
    #[serde(default)]
    pub action_id: Option<Uuid>,
    /// Local handle of the captured blob (file path or platform URI)
    pub local_uri: String,
    /// Inline preview, typically a small data URL
    #[serde(default)]
    pub preview: Option<String>,
    pub content_type: String,
    pub size_bytes: u64,
}

impl MediaReference {
    pub fn new(local_uri: impl Into<String>, content_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            action_id: None,
            local_uri: local_uri.into(),
            preview: None,
            content_type: content_type.into(),
            size_bytes,
        }
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }
}

/// Proof-of-delivery payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryProof {
    #[serde(default)]
    pub photos: Vec<MediaReference>,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Failed-delivery payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<MediaReference>,
}

/// A courier action together with its kind-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CourierAction {
    AcceptJob,
    RejectJob {
        #[serde(default)]
        reason: Option<String>,
    },
    UpdateStatus {
        status: JobStatus,
        #[serde(default)]
        reason: Option<String>,
    },
    SubmitDeliveryProof(DeliveryProof),
    SubmitFailureReport(FailureReport),
    ReturnToSupplier {
        reason: String,
    },
}

impl CourierAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            CourierAction::AcceptJob => ActionKind::AcceptJob,
            CourierAction::RejectJob { .. } => ActionKind::RejectJob,
            CourierAction::UpdateStatus { .. } => ActionKind::UpdateStatus,
            CourierAction::SubmitDeliveryProof(_) => ActionKind::SubmitDeliveryProof,
            CourierAction::SubmitFailureReport(_) => ActionKind::SubmitFailureReport,
            CourierAction::ReturnToSupplier { .. } => ActionKind::ReturnToSupplier,
        }
    }

    /// Status the job ends up in once the action is applied
    pub fn target_status(&self) -> Option<JobStatus> {
        match self {
            CourierAction::AcceptJob => Some(JobStatus::Accepted),
            CourierAction::RejectJob { .. } => None,
            CourierAction::UpdateStatus { status, .. } => Some(*status),
            CourierAction::SubmitDeliveryProof(_) => Some(JobStatus::Delivered),
            CourierAction::SubmitFailureReport(_) => Some(JobStatus::Failed),
            CourierAction::ReturnToSupplier { .. } => Some(JobStatus::Returned),
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            CourierAction::SubmitDeliveryProof(_) => Priority::Critical,
            CourierAction::SubmitFailureReport(_) => Priority::High,
            CourierAction::UpdateStatus { .. } | CourierAction::ReturnToSupplier { .. } => {
                Priority::Normal
            }
            CourierAction::AcceptJob | CourierAction::RejectJob { .. } => Priority::Low,
        }
    }

    pub fn photos(&self) -> &[MediaReference] {
        match self {
            CourierAction::SubmitDeliveryProof(proof) => &proof.photos,
            CourierAction::SubmitFailureReport(report) => &report.photos,
            _ => &[],
        }
    }

    fn photos_mut(&mut self) -> Option<&mut Vec<MediaReference>> {
        match self {
            CourierAction::SubmitDeliveryProof(proof) => Some(&mut proof.photos),
            CourierAction::SubmitFailureReport(report) => Some(&mut report.photos),
            _ => None,
        }
    }

    /// Payload checks that do not depend on the job's current status
    pub fn validate(&self) -> Result<(), SharedError> {
        match self {
            CourierAction::UpdateStatus { status, .. } => match status {
                JobStatus::PickedUp | JobStatus::InTransit | JobStatus::OutForDelivery => Ok(()),
                other => Err(SharedError::validation(
                    "status",
                    format!("'{}' cannot be set with a plain status update", other),
                )),
            },
            CourierAction::SubmitFailureReport(report) if report.reason.trim().is_empty() => {
                Err(SharedError::validation("reason", "a failure report needs a reason"))
            }
            CourierAction::ReturnToSupplier { reason } if reason.trim().is_empty() => Err(
                SharedError::validation("reason", "a return to supplier needs a reason"),
            ),
            CourierAction::SubmitDeliveryProof(proof) => {
                if let Some(otp) = &proof.otp {
                    if otp.is_empty() || !otp.chars().all(|c| c.is_ascii_digit()) {
                        return Err(SharedError::validation("otp", "OTP must be numeric"));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Identity of a logical transition; at most one pending action per key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransitionKey {
    pub job_id: JobId,
    pub kind: ActionKind,
    pub target: Option<JobStatus>,
}

/// Durable record of a courier action the server has not confirmed yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: Uuid,
    /// Insertion order assigned by the store; replay order. 0 until persisted.
    #[serde(default)]
    pub sequence: u64,
    pub job_id: JobId,
    pub action: CourierAction,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl PendingAction {
    /// Record a new action; attached photos become owned by it
    pub fn new(job_id: impl Into<JobId>, mut action: CourierAction) -> Self {
        let id = Uuid::new_v4();
        if let Some(photos) = action.photos_mut() {
            for photo in photos.iter_mut() {
                photo.action_id = Some(id);
            }
        }
        Self {
            id,
            sequence: 0,
            job_id: job_id.into(),
            action,
            created_at: Utc::now(),
            attempts: 0,
            last_attempt: None,
            last_error: None,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    pub fn target_status(&self) -> Option<JobStatus> {
        self.action.target_status()
    }

    pub fn priority(&self) -> Priority {
        self.action.priority()
    }

    pub fn transition_key(&self) -> TransitionKey {
        TransitionKey {
            job_id: self.job_id.clone(),
            kind: self.kind(),
            target: self.target_status(),
        }
    }
}

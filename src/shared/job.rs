//! Delivery Job Model
//!
//! The courier-facing view of a delivery task and the status lifecycle it
//! moves through.
//!
//! # Lifecycle
//!
//! ```text
//! available -> accepted -> picked_up -> in_transit -> out_for_delivery -> delivered
//!                  \____________\____________\_______________\________-> failed | returned
//! ```
//!
//! Moving forward may skip intermediate in-progress states. `failed` and
//! `returned` branch off any in-progress state. Terminal states never move.

use crate::shared::error::SharedError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend identifier of a delivery job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Delivery job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Available,
    Accepted,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
    Returned,
}

impl JobStatus {
    /// Position on the lifecycle; all terminal states share the last rank
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Available => 0,
            JobStatus::Accepted => 1,
            JobStatus::PickedUp => 2,
            JobStatus::InTransit => 3,
            JobStatus::OutForDelivery => 4,
            JobStatus::Delivered | JobStatus::Failed | JobStatus::Returned => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Delivered | JobStatus::Failed | JobStatus::Returned
        )
    }

    /// Accepted by a courier but not yet finished
    pub fn is_in_progress(self) -> bool {
        !self.is_terminal() && self != JobStatus::Available
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Re-applying the current status is always allowed so that repeated
    /// optimistic updates are harmless.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            JobStatus::Available => next == JobStatus::Accepted,
            s if s.is_in_progress() => match next {
                JobStatus::Failed | JobStatus::Returned => true,
                JobStatus::Available => false,
                _ => next.rank() > s.rank(),
            },
            _ => false,
        }
    }

    /// Validated transition
    pub fn advance(self, next: JobStatus) -> Result<JobStatus, SharedError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SharedError::transition(self, next))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Available => "available",
            JobStatus::Accepted => "accepted",
            JobStatus::PickedUp => "picked_up",
            JobStatus::InTransit => "in_transit",
            JobStatus::OutForDelivery => "out_for_delivery",
            JobStatus::Delivered => "delivered",
            JobStatus::Failed => "failed",
            JobStatus::Returned => "returned",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact person for a pickup or drop-off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Delivery job as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryJob {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub pickup_address: String,
    #[serde(default)]
    pub dropoff_address: String,
    #[serde(default)]
    pub sender: Option<Contact>,
    #[serde(default)]
    pub receiver: Option<Contact>,
    /// Fee charged to the sender
    #[serde(default)]
    pub delivery_fee: Option<f64>,
    /// Courier's share of the fee
    #[serde(default)]
    pub courier_earning: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DeliveryJob {
    /// Minimal job, mostly useful for tests and placeholders
    pub fn new(id: impl Into<JobId>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            pickup_address: String::new(),
            dropoff_address: String::new(),
            sender: None,
            receiver: None,
            delivery_fee: None,
            courier_earning: None,
            updated_at: None,
        }
    }
}

//! Shared Error Types
//!
//! Errors raised by the platform-agnostic data model: invalid job status
//! transitions and malformed courier actions.
//!
//! # Error Categories
//!
//! - `InvalidTransition` - a status change the job lifecycle does not allow
//! - `ValidationError` - an action payload that fails validation
//!
//! # Usage
//!
//! ```rust
//! use courier_sync::shared::error::SharedError;
//!
//! let error = SharedError::validation("reason", "a failure report needs a reason");
//! assert!(error.to_string().contains("reason"));
//! ```
use crate::shared::job::JobStatus;
use thiserror::Error;

/// Errors produced by the shared job/action model
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SharedError {
    /// The job lifecycle does not allow moving from `from` to `to`
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Status the job is currently in
        from: JobStatus,
        /// Status that was requested
        to: JobStatus,
    },

    /// Action payload validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new invalid transition error
    pub fn transition(from: JobStatus, to: JobStatus) -> Self {
        Self::InvalidTransition { from, to }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

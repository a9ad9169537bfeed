//! Shared Module
//!
//! Platform-agnostic types: the delivery job model, courier actions and their
//! durable pending form, configuration and the shared error type. Everything
//! here is plain data that serializes to the JSON exchanged with the backend
//! and written to local storage.

/// Delivery jobs and their status lifecycle
pub mod job;

/// Courier actions and pending-action records
pub mod action;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use action::{
    ActionKind, CourierAction, DeliveryProof, FailureReport, MediaReference, PendingAction,
    Priority, TransitionKey,
};
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use job::{Contact, DeliveryJob, JobId, JobStatus};

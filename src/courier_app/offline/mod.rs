//! # Offline Courier Actions
//!
//! Lets a courier keep accepting jobs, updating delivery status and capturing
//! proof of delivery while disconnected, and replays those actions against the
//! backend once connectivity returns.
//!
//! ## Architecture
//!
//! The offline system consists of:
//! - **Optimistic UI**: the job board shows queued actions immediately
//! - **Action Queue**: persists actions and drains them serially when online
//! - **Reconciliation**: folds server state back into the optimistic board
//! - **Retry Logic**: attempt ceiling and exponential backoff
//!
//! ## Key Components
//!
//! - `optimistic.rs`: two-phase (confirmed vs local) job state
//! - `queue.rs`: submission, drain and dead-lettering
//! - `retry.rs`: retry policy and backoff strategies
//! - `reconciliation.rs`: status merge and conflict detection
//!
//! ## Usage
//!
//! ```rust,no_run
//! use courier_sync::courier_app::api_client::HttpJobsApi;
//! use courier_sync::courier_app::config::Config;
//! use courier_sync::courier_app::local_db::{LocalActionStore, MemoryStorage};
//! use courier_sync::courier_app::offline::ActionQueueManager;
//! use courier_sync::courier_app::sync::network_monitor::{ConnectivityMonitor, NetworkStatus};
//! use courier_sync::shared::CourierAction;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let api = Arc::new(HttpJobsApi::new(config.clone())?);
//! let store = LocalActionStore::open(Arc::new(MemoryStorage::new()), None).await?;
//! let manager = ActionQueueManager::new(
//!     api,
//!     Arc::new(store),
//!     ConnectivityMonitor::new(NetworkStatus::Online),
//!     config.app(),
//! );
//!
//! manager.refresh().await?;
//! manager.submit("J1", CourierAction::AcceptJob).await?;
//! # Ok(())
//! # }
//! ```

pub mod optimistic;
pub mod queue;
pub mod reconciliation;
pub mod retry;

// Re-export main types
pub use optimistic::{JobBoard, JobView, TrackedJob};
pub use queue::{
    ActionQueueManager, DrainReport, PreparedAction, QueueError, QueueReason, StopReason,
    SubmitOutcome,
};
pub use reconciliation::{
    is_superseded, merge_status, ReconciliationConflict, ReconciliationResult, StatusMerge,
    StatusReconciler,
};
pub use retry::{BackoffStrategy, RetryPolicy};

//! Courier Sync - Main Library
//!
//! Courier Sync is the client-side offline layer of a delivery platform's
//! courier app. A courier can keep accepting jobs, updating delivery status and
//! capturing proof of delivery while disconnected; the queued actions are
//! replayed against the REST backend, in order, once connectivity returns.
//!
//! # Module Structure
//!
//! The library is organized into two main modules:
//!
//! - **`shared`** - Platform-agnostic types
//!   - Delivery jobs and the job status lifecycle
//!   - Courier actions, pending actions, media references
//!   - Configuration and error types
//!
//! - **`courier_app`** - The offline subsystem
//!   - Local action store (SQLite or in-memory)
//!   - Connectivity monitor with reachability probing
//!   - Action queue manager, optimistic job board, reconciliation
//!   - Background sync service and the jobs API client
//!
//! # Usage
//!
//! ```rust,no_run
//! use courier_sync::courier_app::api_client::HttpJobsApi;
//! use courier_sync::courier_app::config::Config;
//! use courier_sync::courier_app::local_db::{sqlite::SqliteStorage, LocalActionStore};
//! use courier_sync::courier_app::offline::ActionQueueManager;
//! use courier_sync::courier_app::sync::{ConnectivityMonitor, NetworkStatus, SyncConfig, SyncService};
//! use courier_sync::shared::{CourierAction, JobStatus};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let api = Arc::new(HttpJobsApi::new(config.clone())?);
//! let store = LocalActionStore::open(Arc::new(SqliteStorage::open_default().await?), None).await?;
//! let monitor = ConnectivityMonitor::with_probe(NetworkStatus::Online, api.clone(), 3);
//!
//! let manager = ActionQueueManager::new(api, Arc::new(store), monitor, config.app());
//! manager.refresh().await?;
//!
//! let mut sync = SyncService::new(manager.clone(), SyncConfig::from(config.app()));
//! sync.start()?;
//!
//! manager
//!     .submit("J1", CourierAction::UpdateStatus { status: JobStatus::PickedUp, reason: None })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - `Result<T, E>` for fallible operations
//! - Custom error types in `shared::error`, `shared::config` and per `courier_app` module

/// Shared types and data structures
pub mod shared;

/// Client-side offline action queue
pub mod courier_app;

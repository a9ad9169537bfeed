//! Courier App Module
//!
//! The client-side offline subsystem of the courier app: everything between a
//! courier's tap on "picked up" and the backend confirming it.
//!
//! # Architecture
//!
//! The courier_app module is organized into focused submodules:
//!
//! - **`config`** - Runtime configuration (server URL, token storage)
//! - **`api_client`** - HTTP client for the job endpoints
//! - **`local_db`** - Durable store of pending and dead-lettered actions
//! - **`offline`** - Action queue, optimistic job board, reconciliation, retry
//! - **`sync`** - Connectivity monitor, sync notifications, background sync
//! - **`main`** - Application entry point (binary)
//!
//! # Module Structure
//!
//! ```text
//! courier_app/
//! ├── mod.rs         - Module exports and documentation
//! ├── main.rs        - Application entry point
//! ├── config.rs      - Configuration management
//! ├── api_client.rs  - Jobs API client
//! ├── local_db/      - Local action store and SQLite backend
//! ├── offline/       - Queue manager and reconciliation
//! └── sync/          - Connectivity and background sync
//! ```

pub mod api_client;
pub mod config;
pub mod local_db;
pub mod offline;
pub mod sync;

// Re-export commonly used types
pub use api_client::{ApiError, FailureClass, HttpJobsApi, JobsApi};
pub use config::Config;
pub use local_db::{LocalActionStore, MemoryStorage, StorageBackend, StoreError};
pub use offline::{ActionQueueManager, DrainReport, QueueError, SubmitOutcome};
pub use sync::{ConnectivityMonitor, NetworkStatus, SyncEvent, SyncService};

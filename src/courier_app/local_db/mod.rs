//! # Local Action Store
//!
//! Durable, crash-safe persistence of pending courier actions and of the
//! dead-letter list.
//!
//! ## Architecture
//!
//! Storage is a small key/value abstraction ([`StorageBackend`]) holding two
//! JSON arrays:
//! - `courier.pending_actions`: actions awaiting replay, oldest first
//! - `courier.dead_letters`: actions that will not be retried automatically
//!
//! [`LocalActionStore`] keeps an in-memory mirror of both arrays. Every
//! mutation is written to the backend first and only then applied to the
//! mirror, so the mirror is always reconstructible from storage and a reload
//! never loses un-replayed actions.
//!
//! ## Key Components
//!
//! - `LocalActionStore`: append/list/update/remove, quota eviction, dead letters
//! - `MemoryStorage`: process-local backend for tests and ephemeral sessions
//! - `sqlite.rs`: SQLite backend used by the application
//! - `schema.rs`: schema version and migrations for the SQLite backend
//!
//! ## Usage
//!
//! ```rust,no_run
//! use courier_sync::courier_app::local_db::{LocalActionStore, sqlite::SqliteStorage};
//! use courier_sync::shared::{CourierAction, PendingAction};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(SqliteStorage::open_default().await?);
//! let store = LocalActionStore::open(backend, None).await?;
//!
//! store.append(PendingAction::new("J1", CourierAction::AcceptJob)).await?;
//! for action in store.list().await {
//!     println!("{} {}", action.kind(), action.job_id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod schema;
pub mod sqlite;

use crate::shared::{JobId, JobStatus, PendingAction, Priority};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Storage key of the pending-action array
pub const PENDING_KEY: &str = "courier.pending_actions";
/// Storage key of the dead-letter array
pub const DEAD_LETTER_KEY: &str = "courier.dead_letters";

/// Local storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage quota exceeded: {required} bytes needed, {quota} allowed")]
    QuotaExceeded { required: usize, quota: usize },

    #[error("a pending action already covers this transition ({existing})")]
    Duplicate { existing: Uuid },

    #[error("pending action {0} not found")]
    NotFound(Uuid),

    #[error("corrupt data under '{key}': {message}")]
    Corrupt { key: String, message: String },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// String key/value persistence
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process backend. Clones share the same map, which lets tests simulate a
/// reload by opening a second store over the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Why an action stopped being retried
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeadLetterReason {
    /// The server refused the action (validation, conflict)
    Rejected { status: Option<u16> },
    /// Retryable failures hit the attempt ceiling
    RetriesExhausted,
    /// A refresh showed a terminal server state contradicting the action
    Conflict { server_status: JobStatus },
}

/// Action awaiting manual resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub action: PendingAction,
    pub reason: DeadLetterReason,
    /// Human-readable notice for the courier
    pub message: String,
    pub dead_lettered_at: DateTime<Utc>,
}

/// Changes applied by [`LocalActionStore::update`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionPatch {
    pub attempts: Option<u32>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ActionPatch {
    /// Record one failed attempt
    pub fn failed_attempt(attempts: u32, error: impl Into<String>) -> Self {
        Self {
            attempts: Some(attempts),
            last_attempt: Some(Utc::now()),
            last_error: Some(error.into()),
        }
    }

    /// Record a failure that does not use up an attempt
    pub fn uncounted_failure(error: impl Into<String>) -> Self {
        Self {
            attempts: None,
            last_attempt: Some(Utc::now()),
            last_error: Some(error.into()),
        }
    }

    fn apply(self, action: &mut PendingAction) {
        if let Some(attempts) = self.attempts {
            action.attempts = attempts;
        }
        if let Some(at) = self.last_attempt {
            action.last_attempt = Some(at);
        }
        if let Some(error) = self.last_error {
            action.last_error = Some(error);
        }
    }
}

/// Result of a successful append
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    /// The stored action, with its sequence number assigned
    pub action: PendingAction,
    /// Lower-priority actions dropped to make room
    pub evicted: Vec<PendingAction>,
}

#[derive(Debug, Default)]
struct StoreState {
    pending: Vec<PendingAction>,
    dead_letters: Vec<DeadLetter>,
    next_sequence: u64,
}

/// Durable queue of pending actions plus the dead-letter list
pub struct LocalActionStore {
    backend: Arc<dyn StorageBackend>,
    quota_bytes: Option<usize>,
    state: Mutex<StoreState>,
}

impl std::fmt::Debug for LocalActionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalActionStore")
            .field("quota_bytes", &self.quota_bytes)
            .finish_non_exhaustive()
    }
}

impl LocalActionStore {
    /// Load the persisted collections from `backend`
    pub async fn open(
        backend: Arc<dyn StorageBackend>,
        quota_bytes: Option<usize>,
    ) -> Result<Self, StoreError> {
        let mut pending: Vec<PendingAction> = load(backend.as_ref(), PENDING_KEY).await?;
        let dead_letters: Vec<DeadLetter> = load(backend.as_ref(), DEAD_LETTER_KEY).await?;

        // A crash between the two writes of a dead-lettering leaves the action
        // in both lists; the dead-letter entry is authoritative.
        let dead_ids: HashSet<Uuid> = dead_letters.iter().map(|d| d.action.id).collect();
        let before = pending.len();
        pending.retain(|action| !dead_ids.contains(&action.id));
        if pending.len() != before {
            persist(backend.as_ref(), PENDING_KEY, &pending).await?;
        }

        pending.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        let next_sequence = pending.iter().map(|a| a.sequence + 1).max().unwrap_or(1);

        tracing::info!(
            "[Store] opened with {} pending and {} dead-lettered actions",
            pending.len(),
            dead_letters.len()
        );

        Ok(Self {
            backend,
            quota_bytes,
            state: Mutex::new(StoreState {
                pending,
                dead_letters,
                next_sequence,
            }),
        })
    }

    /// Like [`open`](Self::open), but wipes collections that cannot be parsed
    pub async fn open_or_recover(
        backend: Arc<dyn StorageBackend>,
        quota_bytes: Option<usize>,
    ) -> Result<Self, StoreError> {
        match Self::open(Arc::clone(&backend), quota_bytes).await {
            Err(StoreError::Corrupt { key, message }) => {
                tracing::error!("[Store] '{}' is corrupt ({}); clearing local queue", key, message);
                backend.delete(PENDING_KEY).await?;
                backend.delete(DEAD_LETTER_KEY).await?;
                Self::open(backend, quota_bytes).await
            }
            other => other,
        }
    }

    /// Append one action at the end of the replay order.
    ///
    /// Rejects a second action for the same logical transition. When the quota
    /// would be exceeded, lower-priority actions are evicted (oldest first);
    /// delivery proofs are never evicted.
    pub async fn append(&self, mut action: PendingAction) -> Result<AppendOutcome, StoreError> {
        let mut state = self.state.lock().await;

        let key = action.transition_key();
        if let Some(existing) = state.pending.iter().find(|p| p.transition_key() == key) {
            return Err(StoreError::Duplicate {
                existing: existing.id,
            });
        }

        action.sequence = state.next_sequence;
        let mut pending = state.pending.clone();
        pending.push(action.clone());
        let evicted = self.fit_quota(&mut pending, action.id)?;

        persist(self.backend.as_ref(), PENDING_KEY, &pending).await?;
        state.pending = pending;
        state.next_sequence += 1;

        for dropped in &evicted {
            tracing::warn!(
                "[Store] evicted {} for job {} to stay within quota",
                dropped.kind(),
                dropped.job_id
            );
        }
        Ok(AppendOutcome { action, evicted })
    }

    fn fit_quota(
        &self,
        pending: &mut Vec<PendingAction>,
        incoming: Uuid,
    ) -> Result<Vec<PendingAction>, StoreError> {
        let Some(quota) = self.quota_bytes else {
            return Ok(Vec::new());
        };

        let mut evicted = Vec::new();
        loop {
            let required = serde_json::to_vec(&*pending)?.len();
            if required <= quota {
                return Ok(evicted);
            }
            let victim = pending
                .iter()
                .enumerate()
                .filter(|(_, action)| action.priority() < Priority::Critical)
                .min_by_key(|(_, action)| (action.priority(), action.sequence))
                .map(|(index, action)| (index, action.id));
            match victim {
                Some((index, id)) if id != incoming => evicted.push(pending.remove(index)),
                _ => return Err(StoreError::QuotaExceeded { required, quota }),
            }
        }
    }

    /// Pending actions in replay order
    pub async fn list(&self) -> Vec<PendingAction> {
        self.state.lock().await.pending.clone()
    }

    /// Oldest pending action, the next one to replay
    pub async fn front(&self) -> Option<PendingAction> {
        self.state.lock().await.pending.first().cloned()
    }

    pub async fn get(&self, id: Uuid) -> Option<PendingAction> {
        let state = self.state.lock().await;
        state.pending.iter().find(|a| a.id == id).cloned()
    }

    pub async fn pending_for_job(&self, job_id: &JobId) -> Vec<PendingAction> {
        let state = self.state.lock().await;
        state
            .pending
            .iter()
            .filter(|a| &a.job_id == job_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Delete a confirmed action
    pub async fn remove(&self, id: Uuid) -> Result<Option<PendingAction>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.pending.iter().position(|a| a.id == id) else {
            return Ok(None);
        };

        let mut pending = state.pending.clone();
        let removed = pending.remove(index);
        persist(self.backend.as_ref(), PENDING_KEY, &pending).await?;
        state.pending = pending;
        Ok(Some(removed))
    }

    pub async fn update(&self, id: Uuid, patch: ActionPatch) -> Result<PendingAction, StoreError> {
        let mut state = self.state.lock().await;
        let index = state
            .pending
            .iter()
            .position(|a| a.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let mut pending = state.pending.clone();
        patch.apply(&mut pending[index]);
        let updated = pending[index].clone();
        persist(self.backend.as_ref(), PENDING_KEY, &pending).await?;
        state.pending = pending;
        Ok(updated)
    }

    /// Move a pending action to the dead-letter list
    pub async fn dead_letter(
        &self,
        id: Uuid,
        reason: DeadLetterReason,
        message: impl Into<String>,
    ) -> Result<Option<DeadLetter>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.pending.iter().position(|a| a.id == id) else {
            return Ok(None);
        };

        let mut pending = state.pending.clone();
        let action = pending.remove(index);
        let entry = DeadLetter {
            action,
            reason,
            message: message.into(),
            dead_lettered_at: Utc::now(),
        };
        let mut dead_letters = state.dead_letters.clone();
        dead_letters.push(entry.clone());

        // Dead letters first: a crash in between leaves a duplicate that open()
        // resolves, never a lost action.
        persist(self.backend.as_ref(), DEAD_LETTER_KEY, &dead_letters).await?;
        persist(self.backend.as_ref(), PENDING_KEY, &pending).await?;
        state.dead_letters = dead_letters;
        state.pending = pending;
        Ok(Some(entry))
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().await.dead_letters.clone()
    }

    /// Drop a dead letter once the courier has dealt with it
    pub async fn dismiss_dead_letter(&self, id: Uuid) -> Result<Option<DeadLetter>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.dead_letters.iter().position(|d| d.action.id == id) else {
            return Ok(None);
        };

        let mut dead_letters = state.dead_letters.clone();
        let dismissed = dead_letters.remove(index);
        persist(self.backend.as_ref(), DEAD_LETTER_KEY, &dead_letters).await?;
        state.dead_letters = dead_letters;
        Ok(Some(dismissed))
    }

    /// Wipe both collections. Recovery use only.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        tracing::warn!(
            "[Store] clearing {} pending and {} dead-lettered actions",
            state.pending.len(),
            state.dead_letters.len()
        );
        self.backend.delete(PENDING_KEY).await?;
        self.backend.delete(DEAD_LETTER_KEY).await?;
        state.pending.clear();
        state.dead_letters.clear();
        Ok(())
    }
}

async fn load<T>(backend: &dyn StorageBackend, key: &str) -> Result<Vec<T>, StoreError>
where
    T: serde::de::DeserializeOwned,
{
    match backend.read(key).await? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(Vec::new()),
    }
}

async fn persist<T>(backend: &dyn StorageBackend, key: &str, items: &[T]) -> Result<(), StoreError>
where
    T: Serialize,
{
    let raw = serde_json::to_string(items)?;
    backend.write(key, &raw).await.map_err(|e| {
        tracing::error!("[Store] failed to write '{}': {}", key, e);
        e
    })
}

//! Database Schema Definitions
//!
//! Table layout and migrations for the SQLite storage backend.

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

pub const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
)";

/// Key/value table holding the serialized action collections
pub const CREATE_STORAGE_TABLE: &str = "CREATE TABLE IF NOT EXISTS local_storage (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// Schema migrations, in order
pub const MIGRATIONS: &[(i32, &str)] = &[(1, CREATE_STORAGE_TABLE)];

/// Check if database needs migration
pub fn needs_migration(current_version: i32) -> bool {
    current_version < CURRENT_SCHEMA_VERSION
}

/// Get pending migrations
pub fn get_pending_migrations(current_version: i32) -> Vec<(i32, &'static str)> {
    MIGRATIONS
        .iter()
        .filter(|(version, _)| *version > current_version)
        .copied()
        .collect()
}

//! Settings storage abstraction.
//!
//! The guard persists a handful of scoped key/value settings: each
//! lane's enabled flag and run window, plus the scheduler's log
//! entries. This module provides the trait and pluggable backends
//! (in-memory, SQLite).

mod memory;
#[cfg(any(feature = "sqlite", test))]
mod sqlite;

pub use memory::InMemorySettings;
#[cfg(any(feature = "sqlite", test))]
pub use sqlite::SqliteSettings;

use async_trait::async_trait;
use thiserror::Error;

/// Lane-scoped key holding the enabled flag ("1" = enabled).
pub const KEY_ACTIVE: &str = "active";
/// Lane-scoped key holding the last run start timestamp.
pub const KEY_LAST_RUN_START: &str = "last_run_start";
/// Lane-scoped key holding the last run end timestamp.
pub const KEY_LAST_RUN_END: &str = "last_run_end";

/// Errors that can occur during settings operations.
///
/// Any of these is fatal to the current cycle: the gate cannot decide
/// safely when the persisted state cannot be read or written.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings lock was poisoned.
    #[error("settings lock poisoned")]
    LockPoisoned,

    /// A stored value could not be interpreted.
    #[error("invalid stored value for {scope}.{key}: {message}")]
    InvalidValue {
        scope: String,
        key: String,
        message: String,
    },

    /// Backend failure (I/O, database).
    #[error("settings backend error: {0}")]
    Backend(String),
}

/// Durable scoped key/value store.
///
/// Writes must be visible to the next invocation of the process; the
/// store provides no locking, consistency rests on the single-runner
/// assumption.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a value, `None` if the key was never written or was removed.
    async fn get(&self, scope: &str, key: &str) -> Result<Option<String>, SettingsError>;

    /// Write a value, overwriting any previous one.
    async fn put(&self, scope: &str, key: &str, value: &str) -> Result<(), SettingsError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove(&self, scope: &str, key: &str) -> Result<(), SettingsError>;

    /// List all keys within a scope, in unspecified order.
    async fn keys(&self, scope: &str) -> Result<Vec<String>, SettingsError>;
}

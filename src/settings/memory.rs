//! In-memory settings implementation.
//!
//! Provides a thread-safe in-memory backend for testing and development.
//! Data is not persisted across processes, so the crash-recovery
//! behavior of the gate is only observable with a durable backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{SettingsError, SettingsStore};

/// In-memory settings backend.
pub struct InMemorySettings {
    values: RwLock<HashMap<(String, String), String>>,
}

impl InMemorySettings {
    /// Create a new empty in-memory settings store.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettings {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<String>, SettingsError> {
        let values = self
            .values
            .read()
            .map_err(|_| SettingsError::LockPoisoned)?;
        Ok(values.get(&(scope.to_string(), key.to_string())).cloned())
    }

    async fn put(&self, scope: &str, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| SettingsError::LockPoisoned)?;
        values.insert((scope.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn remove(&self, scope: &str, key: &str) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| SettingsError::LockPoisoned)?;
        values.remove(&(scope.to_string(), key.to_string()));
        Ok(())
    }

    async fn keys(&self, scope: &str) -> Result<Vec<String>, SettingsError> {
        let values = self
            .values
            .read()
            .map_err(|_| SettingsError::LockPoisoned)?;
        Ok(values
            .keys()
            .filter(|(s, _)| s == scope)
            .map(|(_, k)| k.clone())
            .collect())
    }
}

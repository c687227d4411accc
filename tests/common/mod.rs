//! Common test utilities shared across integration tests.

use async_trait::async_trait;
use cadence::{ExecutionUnit, InMemorySettings, SettingsStore, UnitError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Create an in-memory settings store with the given lane enabled.
pub async fn enabled_settings(lane: &str) -> Arc<InMemorySettings> {
    let settings = Arc::new(InMemorySettings::new());
    settings.put(lane, "active", "1").await.unwrap();
    settings
}

/// A scripted unit that counts its runs and optionally fails.
pub struct ScriptedUnit {
    name: String,
    fail: bool,
    runs: AtomicU32,
}

impl ScriptedUnit {
    pub fn passing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: false,
            runs: AtomicU32::new(0),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: true,
            runs: AtomicU32::new(0),
        })
    }

    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionUnit for ScriptedUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _budget: Duration) -> Result<(), UnitError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(UnitError::ExecutionFailed(format!("{} broke", self.name)))
        } else {
            Ok(())
        }
    }
}

//! Typed access to a lane's persisted run state.
//!
//! Wraps the raw settings store with the three lane-scoped keys the
//! guard owns: the enabled flag and the last run start/end timestamps.
//! Timestamps are stored as `"%Y-%m-%d %H:%M:%S"` strings.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;

use crate::core::gate::RunState;
use crate::core::types::Lane;
use crate::settings::{
    SettingsError, SettingsStore, KEY_ACTIVE, KEY_LAST_RUN_END, KEY_LAST_RUN_START,
};

/// Stored timestamp format.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp for storage.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp.
///
/// A value that does not parse is fatal: absent-vs-present drives the
/// gate, so corrupt state must not be misread as "never ran".
fn parse_timestamp(scope: &str, key: &str, value: &str) -> Result<DateTime<Utc>, SettingsError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| SettingsError::InvalidValue {
            scope: scope.to_string(),
            key: key.to_string(),
            message: e.to_string(),
        })
}

/// Reads and writes one lane's run state in a settings store.
pub struct LaneStateStore<S: SettingsStore + ?Sized> {
    settings: Arc<S>,
    lane: Lane,
}

impl<S: SettingsStore + ?Sized> LaneStateStore<S> {
    /// Create a state store for the given lane.
    pub fn new(settings: Arc<S>, lane: Lane) -> Self {
        Self { settings, lane }
    }

    /// The lane this store is scoped to.
    pub fn lane(&self) -> &Lane {
        &self.lane
    }

    /// Whether the lane is enabled in settings.
    ///
    /// An absent flag counts as disabled.
    pub async fn is_active(&self) -> Result<bool, SettingsError> {
        let value = self.settings.get(self.lane.as_str(), KEY_ACTIVE).await?;
        Ok(value.as_deref() == Some("1"))
    }

    /// Read the lane's persisted run window.
    pub async fn run_state(&self) -> Result<RunState, SettingsError> {
        Ok(RunState {
            last_started_at: self.read_timestamp(KEY_LAST_RUN_START).await?,
            last_ended_at: self.read_timestamp(KEY_LAST_RUN_END).await?,
        })
    }

    /// Record the start of a cycle.
    pub async fn set_last_start(&self, ts: DateTime<Utc>) -> Result<(), SettingsError> {
        self.settings
            .put(self.lane.as_str(), KEY_LAST_RUN_START, &format_timestamp(ts))
            .await
    }

    /// Record the end of a cycle, or clear the end marker.
    ///
    /// Clearing the marker before running is what makes an in-progress
    /// cycle look crashed to the next invocation until it finishes.
    pub async fn set_last_end(&self, ts: Option<DateTime<Utc>>) -> Result<(), SettingsError> {
        match ts {
            Some(ts) => {
                self.settings
                    .put(self.lane.as_str(), KEY_LAST_RUN_END, &format_timestamp(ts))
                    .await
            }
            None => self.settings.remove(self.lane.as_str(), KEY_LAST_RUN_END).await,
        }
    }

    async fn read_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, SettingsError> {
        match self.settings.get(self.lane.as_str(), key).await? {
            None => Ok(None),
            Some(value) => parse_timestamp(self.lane.as_str(), key, &value).map(Some),
        }
    }
}

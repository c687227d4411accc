//! YAML configuration parsing.
//!
//! Parses the guard configuration file: the lane definition with its
//! unit list, the scheduled jobs, and the storage backend.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::error::ConfigError;

/// Top-level guard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Name of the gated lane.
    pub lane: String,
    /// Grace interval trusted for a start marker with no end marker.
    #[serde(default = "default_grace_minutes")]
    pub grace_minutes: i64,
    /// Per-unit budget when the trigger gives none, in seconds.
    #[serde(default = "default_budget_secs")]
    pub default_budget_secs: u64,
    /// Scheduler log retention, in days.
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: i64,
    /// Storage backend for settings and run state.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Consumer units, in execution order.
    #[serde(default)]
    pub units: Vec<UnitConfig>,
    /// Scheduled job definitions.
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

fn default_grace_minutes() -> i64 {
    5
}

fn default_budget_secs() -> u64 {
    1
}

fn default_log_retention_days() -> i64 {
    30
}

fn default_true() -> bool {
    true
}

/// Storage backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// In-memory storage (non-persistent; the gate cannot observe
    /// previous invocations with this backend).
    #[serde(rename = "memory")]
    #[default]
    Memory,
    /// SQLite storage.
    #[serde(rename = "sqlite")]
    Sqlite {
        /// Path to the database file.
        path: String,
    },
}

/// One consumer unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Unit name, unique within the lane.
    pub name: String,
    /// The command to run.
    pub command: String,
    /// Command arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables for the command.
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Working directory.
    pub working_dir: Option<String>,
}

/// One scheduled job definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job identifier.
    pub id: String,
    /// Project the job belongs to.
    pub project: Option<String>,
    /// Human-readable name. Defaults to the id.
    pub name: Option<String>,
    /// The command to run.
    pub command: String,
    /// Command arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Whether the job participates in batch runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Load the guard configuration from a YAML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<GuardConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let config: GuardConfig =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::YamlError {
            path: path.to_path_buf(),
            source,
        })?;
    validate(&config)?;
    Ok(config)
}

/// Structural validation beyond what serde enforces.
fn validate(config: &GuardConfig) -> Result<(), ConfigError> {
    if config.lane.trim().is_empty() {
        return Err(ConfigError::InvalidConfig("lane must not be blank".into()));
    }
    if config.grace_minutes <= 0 {
        return Err(ConfigError::InvalidConfig(
            "grace_minutes must be positive".into(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for unit in &config.units {
        if unit.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "unit name must not be blank".into(),
            ));
        }
        if !seen.insert(unit.name.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "duplicate unit name: {}",
                unit.name
            )));
        }
    }

    let mut job_ids = std::collections::HashSet::new();
    for job in &config.jobs {
        if job.id.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("job id must not be blank".into()));
        }
        if !job_ids.insert(job.id.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "duplicate job id: {}",
                job.id
            )));
        }
    }

    Ok(())
}

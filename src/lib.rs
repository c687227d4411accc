//! cadence - a cron-gated execution guard.
//!
//! An external trigger (cron, once per minute) invokes the guard; the
//! guard decides whether a new cycle may start on a lane, brackets the
//! run with persisted start/end markers, executes the configured units
//! sequentially with per-unit failure isolation, and self-heals after a
//! crash that left no end marker. A second entry mode dispatches
//! scheduled jobs, batch or single.

pub mod config;
pub mod core;
pub mod dispatch;
pub mod execution;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod settings;
pub mod state;

pub use config::{build_jobs, build_registry, load_config, ConfigError, GuardConfig, StorageConfig};
pub use crate::core::gate::{default_grace, evaluate, GateDecision, RunState};
pub use crate::core::types::{JobId, Lane, ProjectId, UnitName};
pub use crate::core::unit::{ExecutionUnit, UnitError, UnitOutcome};
pub use dispatch::{
    DispatchError, DispatchReport, JobDefinition, JobDispatcher, JobInvocation, JobRepository,
    SchedulerEngine,
};
pub use execution::{CommandUnit, CommandUnitBuilder, BUDGET_ENV_VAR};
pub use registry::{RegistryError, UnitRegistry};
pub use runner::{CycleError, CycleReport, CycleRunner};
pub use scheduler::CommandScheduler;
pub use settings::{InMemorySettings, SettingsError, SettingsStore};
#[cfg(any(feature = "sqlite", test))]
pub use settings::SqliteSettings;
pub use state::LaneStateStore;

//! Configuration loading and validation.

mod builder;
mod error;
mod yaml;

pub use builder::{build_jobs, build_registry};
pub use error::ConfigError;
pub use yaml::{load_config, GuardConfig, JobConfig, StorageConfig, UnitConfig};

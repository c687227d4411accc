//! Builds runtime objects from parsed configuration.

use std::sync::Arc;

use super::error::ConfigError;
use super::yaml::{GuardConfig, JobConfig, UnitConfig};
use crate::core::types::{JobId, ProjectId};
use crate::dispatch::JobDefinition;
use crate::execution::CommandUnit;
use crate::registry::UnitRegistry;

/// Build the unit registry from the configured unit list.
///
/// Registration order is declaration order, which fixes the execution
/// order of the default set.
pub fn build_registry(config: &GuardConfig) -> Result<UnitRegistry, ConfigError> {
    let mut registry = UnitRegistry::new();
    for unit in &config.units {
        registry
            .register(Arc::new(build_unit(unit)))
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
    }
    Ok(registry)
}

fn build_unit(config: &UnitConfig) -> CommandUnit {
    let mut builder = CommandUnit::builder(&config.command)
        .name(&config.name)
        .args(config.args.iter().cloned());
    for (key, value) in &config.environment {
        builder = builder.env(key, value);
    }
    if let Some(ref dir) = config.working_dir {
        builder = builder.working_dir(dir);
    }
    builder.build()
}

/// Build the job definition list from the configured jobs.
pub fn build_jobs(config: &GuardConfig) -> Vec<JobDefinition> {
    config.jobs.iter().map(build_job).collect()
}

fn build_job(config: &JobConfig) -> JobDefinition {
    JobDefinition {
        id: JobId::new(&config.id),
        project_id: config.project.as_deref().map(ProjectId::new),
        name: config.name.clone().unwrap_or_else(|| config.id.clone()),
        program: config.command.clone(),
        args: config.args.clone(),
        enabled: config.enabled,
    }
}

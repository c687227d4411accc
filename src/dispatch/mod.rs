//! Scheduler dispatch entry point.
//!
//! A second entry mode next to the gated cycle: either run every
//! configured scheduled job (batch mode) or look up one job by id and
//! run it once (single-job mode). Both modes clear stale log entries
//! first, and neither is gated by the run gate; the job engine is
//! assumed to enforce its own overlap protection.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::types::{JobId, ProjectId};
use crate::settings::SettingsError;

/// A scheduled job definition, resolved by the repository and executed
/// by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDefinition {
    /// Unique job identifier.
    pub id: JobId,
    /// Project the job belongs to, if scoped.
    pub project_id: Option<ProjectId>,
    /// Human-readable job name.
    pub name: String,
    /// Program to execute.
    pub program: String,
    /// Command arguments.
    pub args: Vec<String>,
    /// Whether the job participates in batch runs.
    pub enabled: bool,
}

/// Identifies what one dispatch invocation should execute.
#[derive(Debug, Clone, Default)]
pub struct JobInvocation {
    /// Run exactly this job instead of the batch, when given.
    pub job_id: Option<JobId>,
    /// Restrict the lookup to this project, when given.
    pub project_id: Option<ProjectId>,
}

/// Errors that abort a dispatch invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Settings read/write failure.
    #[error(transparent)]
    Storage(#[from] SettingsError),

    /// The job engine failed outside the scope of a single job's run.
    #[error("scheduler engine error: {0}")]
    Engine(String),
}

/// The external job engine: owns job semantics and its own log.
#[async_trait]
pub trait SchedulerEngine: Send + Sync {
    /// Drop log entries older than the engine's retention window.
    async fn clear_old_log_entries(&self) -> Result<(), DispatchError>;

    /// Execute every enabled job, isolating per-job failures.
    async fn run_all(&self) -> Result<(), DispatchError>;

    /// Execute one job and return its human-readable log lines.
    ///
    /// With `log_even_noop` set, a job that did nothing still produces
    /// a line.
    async fn run_job(
        &self,
        job: &JobDefinition,
        log_even_noop: bool,
    ) -> Result<Vec<String>, DispatchError>;
}

#[async_trait]
impl<T: SchedulerEngine + ?Sized> SchedulerEngine for std::sync::Arc<T> {
    async fn clear_old_log_entries(&self) -> Result<(), DispatchError> {
        (**self).clear_old_log_entries().await
    }

    async fn run_all(&self) -> Result<(), DispatchError> {
        (**self).run_all().await
    }

    async fn run_job(
        &self,
        job: &JobDefinition,
        log_even_noop: bool,
    ) -> Result<Vec<String>, DispatchError> {
        (**self).run_job(job, log_even_noop).await
    }
}

/// Lookup of job definitions by identifier.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Find a job by id, optionally restricted to a project.
    async fn find(
        &self,
        job_id: &JobId,
        project_id: Option<&ProjectId>,
    ) -> Result<Option<JobDefinition>, DispatchError>;
}

#[async_trait]
impl<T: JobRepository + ?Sized> JobRepository for std::sync::Arc<T> {
    async fn find(
        &self,
        job_id: &JobId,
        project_id: Option<&ProjectId>,
    ) -> Result<Option<JobDefinition>, DispatchError> {
        (**self).find(job_id, project_id).await
    }
}

/// Result of one dispatch invocation.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Log lines to print, one per line (single-job mode).
    pub lines: Vec<String>,
    /// Set when the requested job id was not found.
    pub missing_job: Option<JobId>,
}

impl DispatchReport {
    /// Process exit code. A missing job is reported, not fatal.
    pub fn exit_code(&self) -> i32 {
        0
    }
}

/// Dispatches scheduler invocations to the engine.
pub struct JobDispatcher<E, R> {
    engine: E,
    repository: R,
}

impl<E: SchedulerEngine, R: JobRepository> JobDispatcher<E, R> {
    /// Create a dispatcher over the given engine and repository.
    pub fn new(engine: E, repository: R) -> Self {
        Self { engine, repository }
    }

    /// Execute one dispatch invocation.
    pub async fn dispatch(&self, invocation: &JobInvocation) -> Result<DispatchReport, DispatchError> {
        // Cleanup runs first in both modes, ungated.
        self.engine.clear_old_log_entries().await?;

        let job_id = match &invocation.job_id {
            None => {
                info!("dispatching batch run");
                self.engine.run_all().await?;
                return Ok(DispatchReport::default());
            }
            Some(job_id) => job_id,
        };

        let job = self
            .repository
            .find(job_id, invocation.project_id.as_ref())
            .await?;

        match job {
            None => {
                // Reported, never fatal: the trigger will call again.
                warn!(job_id = %job_id, "job not found");
                Ok(DispatchReport {
                    lines: vec![format!("Job not found: {}", job_id)],
                    missing_job: Some(job_id.clone()),
                })
            }
            Some(job) => {
                info!(job_id = %job.id, "dispatching single job");
                let lines = self.engine.run_job(&job, true).await?;
                Ok(DispatchReport {
                    lines,
                    missing_job: None,
                })
            }
        }
    }
}

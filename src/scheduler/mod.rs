//! Command-backed scheduler engine.
//!
//! Jobs are external commands defined in configuration. Log lines are
//! persisted in the settings store under the `scheduler` scope with
//! keys of the form `log.<epoch_ms>.<seq>`, so both storage backends
//! retain them without a second persistence layer; cleanup prunes
//! entries older than the retention window.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{error, info};

use crate::core::types::{JobId, ProjectId};
use crate::dispatch::{DispatchError, JobDefinition, JobRepository, SchedulerEngine};
use crate::settings::{SettingsError, SettingsStore};

/// Settings scope holding scheduler log entries.
const LOG_SCOPE: &str = "scheduler";
/// Key prefix of a log entry; the remainder is `<epoch_ms>.<seq>`.
const LOG_KEY_PREFIX: &str = "log.";
/// Default log retention, in days.
pub const DEFAULT_LOG_RETENTION_DAYS: i64 = 30;

/// Scheduler engine executing command-backed jobs sequentially.
pub struct CommandScheduler<S: SettingsStore + ?Sized> {
    jobs: Vec<JobDefinition>,
    settings: Arc<S>,
    retention: Duration,
    /// Disambiguates log keys written within the same millisecond.
    log_seq: AtomicU64,
}

impl<S: SettingsStore + ?Sized> CommandScheduler<S> {
    /// Create a scheduler over the given job list and settings store.
    pub fn new(jobs: Vec<JobDefinition>, settings: Arc<S>) -> Self {
        Self {
            jobs,
            settings,
            retention: Duration::days(DEFAULT_LOG_RETENTION_DAYS),
            log_seq: AtomicU64::new(0),
        }
    }

    /// Set the log retention window.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Append a log line to the persisted scheduler log.
    async fn log(&self, line: &str) -> Result<(), SettingsError> {
        let seq = self.log_seq.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}{}.{}", LOG_KEY_PREFIX, Utc::now().timestamp_millis(), seq);
        self.settings.put(LOG_SCOPE, &key, line).await
    }

    /// Run one job's command, returning its log lines.
    ///
    /// Job failures are captured in the lines, not propagated: the
    /// engine owns per-job failure semantics.
    async fn execute(&self, job: &JobDefinition, log_even_noop: bool) -> Vec<String> {
        let mut cmd = Command::new(&job.program);
        cmd.args(&job.args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut lines = Vec::new();
        match cmd.output().await {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
                    lines.push(format!("{}: {}", job.id, line.trim()));
                }
                if output.status.success() {
                    if lines.is_empty() && log_even_noop {
                        lines.push(format!("{}: no output", job.id));
                    }
                    info!(job_id = %job.id, "job completed");
                } else {
                    let code = output.status.code().unwrap_or(-1);
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    error!(job_id = %job.id, code, "job failed");
                    lines.push(format!("{}: failed with code {}: {}", job.id, code, stderr));
                }
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "job could not be started");
                lines.push(format!("{}: failed to start: {}", job.id, e));
            }
        }
        lines
    }
}

#[async_trait]
impl<S: SettingsStore + ?Sized> SchedulerEngine for CommandScheduler<S> {
    async fn clear_old_log_entries(&self) -> Result<(), DispatchError> {
        let cutoff = (Utc::now() - self.retention).timestamp_millis();
        let keys = self.settings.keys(LOG_SCOPE).await?;
        for key in keys {
            let Some(rest) = key.strip_prefix(LOG_KEY_PREFIX) else {
                continue;
            };
            let Some(epoch) = rest
                .split('.')
                .next()
                .and_then(|s| s.parse::<i64>().ok())
            else {
                continue;
            };
            if epoch < cutoff {
                self.settings.remove(LOG_SCOPE, &key).await?;
            }
        }
        Ok(())
    }

    async fn run_all(&self) -> Result<(), DispatchError> {
        for job in self.jobs.iter().filter(|j| j.enabled) {
            let lines = self.execute(job, false).await;
            for line in &lines {
                self.log(line).await?;
            }
        }
        Ok(())
    }

    async fn run_job(
        &self,
        job: &JobDefinition,
        log_even_noop: bool,
    ) -> Result<Vec<String>, DispatchError> {
        let lines = self.execute(job, log_even_noop).await;
        for line in &lines {
            self.log(line).await?;
        }
        Ok(lines)
    }
}

#[async_trait]
impl<S: SettingsStore + ?Sized> JobRepository for CommandScheduler<S> {
    async fn find(
        &self,
        job_id: &JobId,
        project_id: Option<&ProjectId>,
    ) -> Result<Option<JobDefinition>, DispatchError> {
        Ok(self
            .jobs
            .iter()
            .find(|j| {
                &j.id == job_id
                    && match project_id {
                        None => true,
                        Some(p) => j.project_id.as_ref() == Some(p),
                    }
            })
            .cloned())
    }
}

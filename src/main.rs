//! cadence - a cron-gated execution guard.
//!
//! Usage:
//!   cadence consume [UNIT] [SECONDS] --config <file>   Run one gated cycle
//!   cadence scheduler [--job-id ID] --config <file>    Dispatch scheduled jobs

use cadence::{
    build_jobs, build_registry, load_config, CommandScheduler, CycleError, CycleRunner,
    GuardConfig, InMemorySettings, JobDispatcher, JobId, JobInvocation, Lane, LaneStateStore,
    ProjectId, SettingsStore, StorageConfig, UnitName, UnitRegistry,
};
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// cadence - a cron-gated execution guard
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the guard configuration file
    #[arg(short, long, global = true, default_value = "cadence.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one gated cycle over the configured units
    Consume {
        /// Run only this unit instead of the full default set
        #[arg(value_name = "UNIT")]
        unit: Option<String>,

        /// Number of seconds each unit may run
        #[arg(value_name = "SECONDS")]
        seconds: Option<u64>,
    },

    /// Dispatch scheduled jobs (batch, or one job by id)
    Scheduler {
        /// Run exactly this job instead of the batch
        #[arg(long = "job-id")]
        job_id: Option<String>,

        /// Restrict the job lookup to this project
        #[arg(long = "project-id")]
        project_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let settings = match open_settings(&config).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            error!(error = %e, "failed to open settings store");
            return ExitCode::FAILURE;
        }
    };

    let code = match cli.command {
        Commands::Consume { unit, seconds } => run_consume(&config, settings, unit, seconds).await,
        Commands::Scheduler { job_id, project_id } => {
            run_scheduler(&config, settings, job_id, project_id).await
        }
    };

    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Open the configured settings backend.
async fn open_settings(config: &GuardConfig) -> Result<Arc<dyn SettingsStore>, String> {
    match &config.storage {
        StorageConfig::Memory => Ok(Arc::new(InMemorySettings::new())),
        #[cfg(feature = "sqlite")]
        StorageConfig::Sqlite { path } => {
            let settings = cadence::SqliteSettings::new(path)
                .await
                .map_err(|e| e.to_string())?;
            Ok(Arc::new(settings))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageConfig::Sqlite { .. } => {
            Err("sqlite storage requires the 'sqlite' feature".to_string())
        }
    }
}

/// Run one gated cycle and print per-unit outcome lines.
async fn run_consume(
    config: &GuardConfig,
    settings: Arc<dyn SettingsStore>,
    unit: Option<String>,
    seconds: Option<u64>,
) -> i32 {
    let registry: UnitRegistry = match build_registry(config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let runner = CycleRunner::new(
        LaneStateStore::new(settings, Lane::new(config.lane.clone())),
        registry,
    )
    .with_grace(ChronoDuration::minutes(config.grace_minutes))
    .with_default_budget(Duration::from_secs(config.default_budget_secs));

    let requested = unit.map(UnitName::new);
    match runner.run_cycle(requested.as_ref(), seconds, Utc::now()).await {
        Ok(report) => {
            for outcome in report.outcomes() {
                match &outcome.error {
                    None => println!("{} OK", outcome.unit),
                    Some(message) => println!("{} FAILED: {}", outcome.unit, message),
                }
            }
            report.exit_code()
        }
        Err(e) => {
            eprintln!("{}", e);
            match e {
                CycleError::Disabled(_) | CycleError::Throttled { .. } => {}
                ref other => error!(error = %other, "cycle aborted"),
            }
            1
        }
    }
}

/// Dispatch scheduled jobs and print any returned log lines.
async fn run_scheduler(
    config: &GuardConfig,
    settings: Arc<dyn SettingsStore>,
    job_id: Option<String>,
    project_id: Option<String>,
) -> i32 {
    let scheduler = Arc::new(
        CommandScheduler::new(build_jobs(config), settings)
            .with_retention(ChronoDuration::days(config.log_retention_days)),
    );
    let dispatcher = JobDispatcher::new(Arc::clone(&scheduler), scheduler);

    let invocation = JobInvocation {
        job_id: job_id.map(JobId::new),
        project_id: project_id.map(ProjectId::new),
    };

    match dispatcher.dispatch(&invocation).await {
        Ok(report) => {
            for line in &report.lines {
                println!("{}", line);
            }
            report.exit_code()
        }
        Err(e) => {
            eprintln!("{}", e);
            error!(error = %e, "dispatch failed");
            1
        }
    }
}

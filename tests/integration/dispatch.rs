//! Scheduler dispatch scenarios over the command-backed engine.

use cadence::{
    CommandScheduler, InMemorySettings, JobDefinition, JobDispatcher, JobId, JobInvocation,
    ProjectId, SettingsStore,
};
use chrono::Duration;
use std::sync::Arc;

fn echo_job(id: &str, message: &str) -> JobDefinition {
    JobDefinition {
        id: JobId::new(id),
        project_id: None,
        name: id.to_string(),
        program: "echo".to_string(),
        args: vec![message.to_string()],
        enabled: true,
    }
}

fn dispatcher(
    jobs: Vec<JobDefinition>,
    settings: Arc<InMemorySettings>,
) -> JobDispatcher<Arc<CommandScheduler<InMemorySettings>>, Arc<CommandScheduler<InMemorySettings>>>
{
    let scheduler = Arc::new(CommandScheduler::new(jobs, settings));
    JobDispatcher::new(Arc::clone(&scheduler), scheduler)
}

#[tokio::test]
async fn test_batch_run_executes_enabled_jobs_and_persists_log() {
    let settings = Arc::new(InMemorySettings::new());
    let mut disabled = echo_job("skipped", "never");
    disabled.enabled = false;
    let dispatcher = dispatcher(
        vec![echo_job("export", "exported"), disabled],
        Arc::clone(&settings),
    );

    let report = dispatcher.dispatch(&JobInvocation::default()).await.unwrap();
    assert!(report.lines.is_empty());
    assert_eq!(report.exit_code(), 0);

    // The enabled job's output landed in the persisted log.
    let keys = settings.keys("scheduler").await.unwrap();
    assert_eq!(keys.len(), 1);
    let line = settings.get("scheduler", &keys[0]).await.unwrap().unwrap();
    assert_eq!(line, "export: exported");
}

#[tokio::test]
async fn test_single_job_returns_its_log_lines() {
    let settings = Arc::new(InMemorySettings::new());
    let dispatcher = dispatcher(vec![echo_job("export", "exported")], settings);

    let invocation = JobInvocation {
        job_id: Some(JobId::new("export")),
        project_id: None,
    };
    let report = dispatcher.dispatch(&invocation).await.unwrap();
    assert_eq!(report.lines, vec!["export: exported"]);
    assert_eq!(report.missing_job, None);
}

#[tokio::test]
async fn test_missing_job_reports_and_skips() {
    let settings = Arc::new(InMemorySettings::new());
    let dispatcher = dispatcher(vec![echo_job("export", "exported")], Arc::clone(&settings));

    let invocation = JobInvocation {
        job_id: Some(JobId::new("ghost")),
        project_id: None,
    };
    let report = dispatcher.dispatch(&invocation).await.unwrap();
    assert_eq!(report.missing_job, Some(JobId::new("ghost")));
    assert_eq!(report.lines, vec!["Job not found: ghost"]);
    assert_eq!(report.exit_code(), 0);

    // Nothing ran, so nothing was logged.
    assert!(settings.keys("scheduler").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_project_scoped_lookup() {
    let settings = Arc::new(InMemorySettings::new());
    let mut scoped = echo_job("export", "exported");
    scoped.project_id = Some(ProjectId::new("42"));
    let dispatcher = dispatcher(vec![scoped], settings);

    let wrong_project = JobInvocation {
        job_id: Some(JobId::new("export")),
        project_id: Some(ProjectId::new("41")),
    };
    let report = dispatcher.dispatch(&wrong_project).await.unwrap();
    assert_eq!(report.missing_job, Some(JobId::new("export")));

    let right_project = JobInvocation {
        job_id: Some(JobId::new("export")),
        project_id: Some(ProjectId::new("42")),
    };
    let report = dispatcher.dispatch(&right_project).await.unwrap();
    assert_eq!(report.lines, vec!["export: exported"]);
}

#[tokio::test]
async fn test_dispatch_prunes_stale_log_entries_first() {
    let settings = Arc::new(InMemorySettings::new());
    settings.put("scheduler", "log.1000.0", "old").await.unwrap();

    let scheduler = Arc::new(
        CommandScheduler::new(vec![echo_job("export", "exported")], Arc::clone(&settings))
            .with_retention(Duration::days(1)),
    );
    let dispatcher = JobDispatcher::new(Arc::clone(&scheduler), scheduler);

    dispatcher.dispatch(&JobInvocation::default()).await.unwrap();

    let keys = settings.keys("scheduler").await.unwrap();
    assert!(!keys.contains(&"log.1000.0".to_string()));
    // The fresh run's line is still there.
    assert_eq!(keys.len(), 1);
}

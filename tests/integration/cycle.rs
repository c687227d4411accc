//! End-to-end cycle scenarios: configuration to execution.

use crate::common::{enabled_settings, ScriptedUnit};
use cadence::{
    build_registry, CycleError, CycleRunner, ExecutionUnit, GuardConfig, Lane, LaneStateStore,
    UnitName, UnitRegistry,
};
use chrono::Utc;
use std::sync::Arc;

#[tokio::test]
async fn test_cycle_from_yaml_config() {
    let config: GuardConfig = serde_yaml::from_str(
        r#"
lane: consumers
units:
  - name: first
    command: "true"
  - name: second
    command: "true"
"#,
    )
    .unwrap();

    let settings = enabled_settings("consumers").await;
    let registry = build_registry(&config).unwrap();
    let runner = CycleRunner::new(
        LaneStateStore::new(Arc::clone(&settings), Lane::new("consumers")),
        registry,
    );

    let report = runner.run_cycle(None, None, Utc::now()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.outcomes().len(), 2);
}

#[tokio::test]
async fn test_two_consecutive_cycles_both_allowed() {
    let settings = enabled_settings("consumers").await;
    let unit = ScriptedUnit::passing("orders");
    let mut registry = UnitRegistry::new();
    registry
        .register(Arc::clone(&unit) as Arc<dyn ExecutionUnit>)
        .unwrap();
    let runner = CycleRunner::new(
        LaneStateStore::new(settings, Lane::new("consumers")),
        registry,
    );

    // A clean first cycle never throttles the second, regardless of how
    // soon it follows.
    runner.run_cycle(None, None, Utc::now()).await.unwrap();
    runner.run_cycle(None, None, Utc::now()).await.unwrap();
    assert_eq!(unit.runs(), 2);
}

#[tokio::test]
async fn test_failed_unit_still_reports_and_sets_exit_code() {
    let settings = enabled_settings("consumers").await;
    let failing = ScriptedUnit::failing("invoices");
    let passing = ScriptedUnit::passing("orders");
    let mut registry = UnitRegistry::new();
    registry
        .register(Arc::clone(&failing) as Arc<dyn ExecutionUnit>)
        .unwrap();
    registry
        .register(Arc::clone(&passing) as Arc<dyn ExecutionUnit>)
        .unwrap();
    let runner = CycleRunner::new(
        LaneStateStore::new(settings, Lane::new("consumers")),
        registry,
    );

    let report = runner.run_cycle(None, None, Utc::now()).await.unwrap();
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.outcomes().len(), 2);
    assert_eq!(
        report.outcomes()[0].error.as_deref(),
        Some("execution failed: invoices broke")
    );
    assert!(report.outcomes()[1].is_success());
    assert_eq!(passing.runs(), 1);
}

#[tokio::test]
async fn test_requested_unit_bypasses_default_set() {
    let settings = enabled_settings("consumers").await;
    let first = ScriptedUnit::passing("invoices");
    let second = ScriptedUnit::passing("orders");
    let mut registry = UnitRegistry::new();
    registry
        .register(Arc::clone(&first) as Arc<dyn ExecutionUnit>)
        .unwrap();
    registry
        .register(Arc::clone(&second) as Arc<dyn ExecutionUnit>)
        .unwrap();
    let runner = CycleRunner::new(
        LaneStateStore::new(settings, Lane::new("consumers")),
        registry,
    );

    let report = runner
        .run_cycle(Some(&UnitName::new("orders")), None, Utc::now())
        .await
        .unwrap();

    assert_eq!(report.outcomes().len(), 1);
    assert_eq!(report.outcomes()[0].unit, UnitName::new("orders"));
    assert_eq!(first.runs(), 0);
    assert_eq!(second.runs(), 1);
}

#[tokio::test]
async fn test_disabled_lane_runs_nothing() {
    // No `active` flag written at all.
    let settings = Arc::new(cadence::InMemorySettings::new());
    let unit = ScriptedUnit::passing("orders");
    let mut registry = UnitRegistry::new();
    registry
        .register(Arc::clone(&unit) as Arc<dyn ExecutionUnit>)
        .unwrap();
    let runner = CycleRunner::new(
        LaneStateStore::new(settings, Lane::new("consumers")),
        registry,
    );

    let err = runner.run_cycle(None, None, Utc::now()).await.unwrap_err();
    assert!(matches!(err, CycleError::Disabled(_)));
    assert_eq!(unit.runs(), 0);
}

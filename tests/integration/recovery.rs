//! Crash recovery scenarios.
//!
//! A cycle that dies between its start and end markers leaves the lane
//! looking "in flight" forever. These tests verify the grace heuristic:
//! the next invocations are throttled within the grace window and
//! admitted after it, and a unit failure (as opposed to a crash) never
//! triggers throttling at all.

use crate::common::{enabled_settings, ScriptedUnit};
use cadence::{
    CycleError, CycleRunner, ExecutionUnit, Lane, LaneStateStore, SettingsStore, UnitRegistry,
};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

fn runner(
    settings: Arc<cadence::InMemorySettings>,
    unit: Arc<ScriptedUnit>,
) -> CycleRunner<cadence::InMemorySettings> {
    let mut registry = UnitRegistry::new();
    registry.register(unit).unwrap();
    CycleRunner::new(
        LaneStateStore::new(settings, Lane::new("consumers")),
        registry,
    )
}

#[tokio::test]
async fn test_crashed_cycle_throttles_then_heals() {
    let settings = enabled_settings("consumers").await;
    // Simulate a crash: a start marker from a previous invocation with
    // no end marker.
    settings
        .put("consumers", "last_run_start", "2024-06-15 10:00:00")
        .await
        .unwrap();

    let unit = ScriptedUnit::passing("orders");
    let runner = runner(Arc::clone(&settings), Arc::clone(&unit));

    // Within the grace window: throttled, with the recovery deadline.
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 10, 3, 0).unwrap();
    let err = runner.run_cycle(None, None, now).await.unwrap_err();
    match err {
        CycleError::Throttled { next_eligible, .. } => {
            assert_eq!(
                next_eligible,
                Utc.with_ymd_and_hms(2024, 6, 15, 10, 5, 0).unwrap()
            );
        }
        other => panic!("expected Throttled, got {:?}", other),
    }
    assert_eq!(unit.runs(), 0);

    // After the grace window: the lane self-heals and runs.
    let later = Utc.with_ymd_and_hms(2024, 6, 15, 10, 5, 1).unwrap();
    let report = runner.run_cycle(None, None, later).await.unwrap();
    assert!(report.is_success());
    assert_eq!(unit.runs(), 1);

    // The healing run wrote a fresh end marker, so the lane is clean.
    assert!(settings
        .get("consumers", "last_run_end")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_unit_failure_is_not_a_crash() {
    let settings = enabled_settings("consumers").await;
    let failing = ScriptedUnit::failing("orders");
    let runner = runner(Arc::clone(&settings), Arc::clone(&failing));

    let report = runner.run_cycle(None, None, Utc::now()).await.unwrap();
    assert_eq!(report.exit_code(), 1);

    // The end marker was written, so the very next invocation is
    // allowed without waiting for any grace interval.
    let report = runner.run_cycle(None, None, Utc::now()).await.unwrap();
    assert_eq!(report.exit_code(), 1);
    assert_eq!(failing.runs(), 2);
}

#[tokio::test]
async fn test_custom_grace_interval_bounds_recovery() {
    let settings = enabled_settings("consumers").await;
    settings
        .put("consumers", "last_run_start", "2024-06-15 10:00:00")
        .await
        .unwrap();

    let unit = ScriptedUnit::passing("orders");
    let mut registry = UnitRegistry::new();
    registry
        .register(Arc::clone(&unit) as Arc<dyn ExecutionUnit>)
        .unwrap();
    let runner = CycleRunner::new(
        LaneStateStore::new(Arc::clone(&settings), Lane::new("consumers")),
        registry,
    )
    .with_grace(Duration::minutes(1));

    let now = Utc.with_ymd_and_hms(2024, 6, 15, 10, 1, 0).unwrap();
    let report = runner.run_cycle(None, None, now).await.unwrap();
    assert!(report.is_success());
}

#[tokio::test]
async fn test_running_cycle_clears_end_marker_first() {
    // Verify the marker ordering from the outside: after a clean cycle
    // both markers are present and end >= start.
    let settings = enabled_settings("consumers").await;
    let unit = ScriptedUnit::passing("orders");
    let runner = runner(Arc::clone(&settings), unit);

    let now = Utc::now();
    runner.run_cycle(None, None, now).await.unwrap();

    let state = LaneStateStore::new(Arc::clone(&settings), Lane::new("consumers"))
        .run_state()
        .await
        .unwrap();
    assert!(!state.is_unterminated());
    assert!(state.last_ended_at.unwrap() >= state.last_started_at.unwrap());
}

//! Run-gate decision logic.
//!
//! The gate decides whether a new cycle may start on a lane, given the
//! persisted run window of the previous cycle. A cycle that crashed
//! before writing its end marker must not wedge the lane forever, so a
//! missing end marker is only trusted for the grace interval; after that
//! the lane self-heals and a new cycle is admitted.
//!
//! This is a heuristic, not mutual exclusion: a unit that legitimately
//! runs longer than the grace interval can still be overlapped by the
//! next cycle. There is no distributed lock behind this gate.

use chrono::{DateTime, Duration, Utc};

/// Default grace interval trusted for a start marker with no end marker.
pub const DEFAULT_GRACE_MINUTES: i64 = 5;

/// Persisted run window of a lane.
///
/// A `last_started_at` newer than `last_ended_at`, or a present start
/// with an absent end, denotes an in-flight or crashed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// When the previous cycle marked its start.
    pub last_started_at: Option<DateTime<Utc>>,
    /// When the previous cycle marked its end, if it finished cleanly.
    pub last_ended_at: Option<DateTime<Utc>>,
}

impl RunState {
    /// A lane that has never run.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the state denotes a cycle that started but never ended.
    pub fn is_unterminated(&self) -> bool {
        self.last_started_at.is_some() && self.last_ended_at.is_none()
    }
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    /// Whether a new cycle may start now.
    pub allowed: bool,
    /// Earliest time a new cycle becomes eligible, when one is pending.
    ///
    /// Only populated for the unterminated-cycle case; a clean or empty
    /// state imposes no waiting period.
    pub next_eligible: Option<DateTime<Utc>>,
}

impl GateDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            next_eligible: None,
        }
    }
}

/// Decide whether a new cycle may start.
///
/// Rules, in order:
/// 1. Never ran before: allowed.
/// 2. Previous cycle ended cleanly: allowed. The external trigger's own
///    cadence bounds frequency, so no elapsed-time check is applied.
/// 3. Start marker with no end marker: allowed once `grace` has elapsed
///    since the start, with `next_eligible = last_started_at + grace`.
pub fn evaluate(state: &RunState, now: DateTime<Utc>, grace: Duration) -> GateDecision {
    let started = match state.last_started_at {
        None => return GateDecision::allowed(),
        Some(ts) => ts,
    };

    if state.last_ended_at.is_some() {
        return GateDecision::allowed();
    }

    // End marker may be missing because of a crash; do not block forever.
    let next_eligible = started + grace;
    GateDecision {
        allowed: now >= next_eligible,
        next_eligible: Some(next_eligible),
    }
}

/// The default grace interval (5 minutes).
pub fn default_grace() -> Duration {
    Duration::minutes(DEFAULT_GRACE_MINUTES)
}

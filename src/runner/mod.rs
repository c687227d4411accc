//! Cycle runner.
//!
//! Orchestrates one gated invocation: checks the enabled flag and the
//! run gate, brackets the run with start/end markers, executes the
//! requested units sequentially with per-unit failure isolation, and
//! aggregates the outcomes into a report.
//!
//! There is no in-process mutual exclusion here. Each invocation is a
//! fresh short-lived process; correctness rests on the external trigger
//! running one instance at a time plus the gate's grace heuristic
//! bounding the damage when a crash breaks that assumption.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::core::gate;
use crate::core::types::{Lane, UnitName};
use crate::core::unit::UnitOutcome;
use crate::registry::{RegistryError, UnitRegistry};
use crate::settings::{SettingsError, SettingsStore};
use crate::state::LaneStateStore;

/// Default per-unit budget when the caller gives none, in seconds.
const DEFAULT_UNIT_BUDGET_SECS: u64 = 1;

/// Errors that abort a cycle before or during execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The lane is switched off in settings.
    #[error("lane '{0}' is disabled in settings")]
    Disabled(Lane),

    /// The gate denied the run: a previous cycle started and never
    /// ended, and the grace interval has not elapsed yet.
    #[error("lane '{lane}' is stopped till {next_eligible} or till the previous cycle ends")]
    Throttled {
        lane: Lane,
        next_eligible: DateTime<Utc>,
    },

    /// The requested unit name is not registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Settings read/write failure, fatal to the cycle.
    #[error(transparent)]
    Storage(#[from] SettingsError),
}

/// Aggregated result of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    outcomes: Vec<UnitOutcome>,
}

impl CycleReport {
    /// Per-unit outcomes, in execution order.
    pub fn outcomes(&self) -> &[UnitOutcome] {
        &self.outcomes
    }

    /// Whether every unit ran without error.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(UnitOutcome::is_success)
    }

    /// Process exit code: 0 if all units succeeded, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Orchestrates gated cycles on one lane.
pub struct CycleRunner<S: SettingsStore + ?Sized> {
    state: LaneStateStore<S>,
    registry: UnitRegistry,
    grace: ChronoDuration,
    default_budget: Duration,
}

impl<S: SettingsStore + ?Sized> CycleRunner<S> {
    /// Create a runner for the given lane.
    pub fn new(state: LaneStateStore<S>, registry: UnitRegistry) -> Self {
        Self {
            state,
            registry,
            grace: gate::default_grace(),
            default_budget: Duration::from_secs(DEFAULT_UNIT_BUDGET_SECS),
        }
    }

    /// Set the grace interval trusted for an unterminated cycle.
    pub fn with_grace(mut self, grace: ChronoDuration) -> Self {
        self.grace = grace;
        self
    }

    /// Set the default per-unit budget.
    pub fn with_default_budget(mut self, budget: Duration) -> Self {
        self.default_budget = budget;
        self
    }

    /// Run one cycle.
    ///
    /// `requested` narrows execution to a single named unit; otherwise
    /// the full default set runs in declaration order. `budget_secs`
    /// overrides the per-unit budget. `now` feeds the gate decision and
    /// the start marker; the end marker is stamped with the wall clock
    /// at completion.
    pub async fn run_cycle(
        &self,
        requested: Option<&UnitName>,
        budget_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, CycleError> {
        let lane = self.state.lane().clone();

        if !self.state.is_active().await? {
            return Err(CycleError::Disabled(lane));
        }

        let run_state = self.state.run_state().await?;
        let decision = gate::evaluate(&run_state, now, self.grace);
        if !decision.allowed {
            // A denial only arises from an unterminated cycle, which
            // always carries its recovery deadline.
            let next_eligible = decision.next_eligible.unwrap_or(now + self.grace);
            return Err(CycleError::Throttled {
                lane,
                next_eligible,
            });
        }
        if run_state.is_unterminated() {
            warn!(
                lane = %lane,
                last_started_at = ?run_state.last_started_at,
                "previous cycle left no end marker; grace interval elapsed, proceeding"
            );
        }

        // Resolve before touching state so an unknown name leaves the
        // run window untouched.
        let units = match requested {
            Some(name) => vec![(name.clone(), self.registry.resolve(name)?)],
            None => {
                let mut units = Vec::with_capacity(self.registry.len());
                for name in self.registry.default_set() {
                    let unit = self.registry.resolve(&name)?;
                    units.push((name, unit));
                }
                units
            }
        };

        self.state.set_last_start(now).await?;
        self.state.set_last_end(None).await?;
        info!(lane = %lane, units = units.len(), "cycle started");

        let budget = budget_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_budget);

        let mut outcomes = Vec::with_capacity(units.len());
        for (name, unit) in units {
            let outcome = match unit.run(budget).await {
                Ok(()) => {
                    info!(lane = %lane, unit = %name, "unit completed");
                    UnitOutcome::success(name)
                }
                Err(e) => {
                    // One unit's failure does not abort the cycle.
                    error!(lane = %lane, unit = %name, error = %e, "unit failed");
                    UnitOutcome::failure(name, e.to_string())
                }
            };
            unit.stop().await;
            outcomes.push(outcome);
        }

        self.state.set_last_end(Some(Utc::now())).await?;
        info!(lane = %lane, "cycle ended");

        Ok(CycleReport { outcomes })
    }
}

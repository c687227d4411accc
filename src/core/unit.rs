//! Execution unit trait and error types.
//!
//! The `ExecutionUnit` trait is the unit of work the guard executes
//! within a cycle: a message consumer draining its queue, or any other
//! named runnable. Implement this trait to plug a unit into the
//! registry.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::types::UnitName;

/// Errors that can occur while running a unit.
#[derive(Debug, Error)]
pub enum UnitError {
    /// The unit could not be started at all.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// An external command exited with a non-zero code.
    #[error("command exited with code {code}: {stderr}")]
    CommandFailed {
        /// Exit code reported by the process (-1 if killed by a signal).
        code: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A named runnable executed within a cycle.
///
/// The budget is cooperative: the unit is expected to self-limit to the
/// given duration (e.g., consume messages for that many seconds and
/// return). The guard never interrupts a unit that has started.
#[async_trait]
pub trait ExecutionUnit: Send + Sync {
    /// The unit's name, used for lookup and per-run reporting.
    fn name(&self) -> &str;

    /// Run the unit for up to the given budget.
    async fn run(&self, budget: Duration) -> Result<(), UnitError>;

    /// Release any underlying resources after a run, success or failure.
    ///
    /// Called once after every `run`. Default implementation does
    /// nothing.
    async fn stop(&self) {}
}

/// Per-unit result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    /// Name of the unit that ran.
    pub unit: UnitName,
    /// Failure message, or `None` on success.
    pub error: Option<String>,
}

impl UnitOutcome {
    /// Record a successful run.
    pub fn success(unit: UnitName) -> Self {
        Self { unit, error: None }
    }

    /// Record a failed run.
    pub fn failure(unit: UnitName, error: impl Into<String>) -> Self {
        Self {
            unit,
            error: Some(error.into()),
        }
    }

    /// Whether the unit ran without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

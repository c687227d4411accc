//! External command execution unit.
//!
//! [`CommandUnit`] wraps an external executable as an [`ExecutionUnit`],
//! which is how configured consumers are actually run: each consumer is
//! a command that drains its queue for the budgeted number of seconds
//! and exits.
//!
//! The budget is exported to the child process as `CADENCE_BUDGET_SECS`
//! and is cooperative: the child is expected to self-limit, the guard
//! never kills it. A child that ignores its budget is the documented
//! residual overlap risk of the grace heuristic.
//!
//! # Example
//!
//! ```ignore
//! let unit = CommandUnit::builder("./consume-orders.sh")
//!     .name("orders-queue")
//!     .arg("--vhost")
//!     .arg("shop")
//!     .env("AMQP_URL", "amqp://localhost")
//!     .build();
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::core::unit::{ExecutionUnit, UnitError};

/// Environment variable carrying the cooperative budget to the child.
pub const BUDGET_ENV_VAR: &str = "CADENCE_BUDGET_SECS";

/// A unit that executes an external command.
#[derive(Debug, Clone)]
pub struct CommandUnit {
    /// Unit name (used for registry lookup and reporting).
    name: String,
    /// Program to execute.
    program: String,
    /// Command arguments.
    args: Vec<String>,
    /// Environment variables.
    env: HashMap<String, String>,
    /// Working directory.
    working_dir: Option<PathBuf>,
}

impl CommandUnit {
    /// Create a new builder for a command unit.
    pub fn builder(program: impl Into<String>) -> CommandUnitBuilder {
        CommandUnitBuilder::new(program)
    }

    /// Get the program being executed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the command arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl ExecutionUnit for CommandUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, budget: Duration) -> Result<(), UnitError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.env(BUDGET_ENV_VAR, budget.as_secs().to_string());

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        // No hard timeout: the budget is cooperative.
        let output = cmd
            .output()
            .await
            .map_err(|e| UnitError::ExecutionFailed(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(unit = %self.name, stdout = %stdout.trim(), "command output");
        }

        if output.status.success() {
            Ok(())
        } else {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(UnitError::CommandFailed { code, stderr })
        }
    }
}

/// Builder for [`CommandUnit`] instances.
#[derive(Debug, Clone)]
pub struct CommandUnitBuilder {
    name: Option<String>,
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl CommandUnitBuilder {
    /// Create a new builder with the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            name: None,
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            working_dir: None,
        }
    }

    /// Set the unit name. Defaults to the program string.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a single environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Build the `CommandUnit`.
    pub fn build(self) -> CommandUnit {
        let name = self.name.unwrap_or_else(|| self.program.clone());
        CommandUnit {
            name,
            program: self.program,
            args: self.args,
            env: self.env,
            working_dir: self.working_dir,
        }
    }
}

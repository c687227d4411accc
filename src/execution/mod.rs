//! Concrete execution unit implementations.

mod command;

pub use command::{CommandUnit, CommandUnitBuilder, BUDGET_ENV_VAR};

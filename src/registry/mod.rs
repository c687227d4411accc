//! Unit registry.
//!
//! Maps unit names to executable handles. The default set preserves
//! registration order, which is the configured declaration order.

use std::sync::Arc;
use thiserror::Error;

use crate::core::types::UnitName;
use crate::core::unit::ExecutionUnit;

/// Errors that can occur when resolving units.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No unit registered under the requested name.
    #[error("unknown unit: {0}")]
    UnknownUnit(UnitName),

    /// A unit with the same name was already registered.
    #[error("duplicate unit: {0}")]
    DuplicateUnit(UnitName),
}

/// Insertion-ordered registry of execution units.
pub struct UnitRegistry {
    units: Vec<(UnitName, Arc<dyn ExecutionUnit>)>,
}

impl UnitRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Register a unit under its own name.
    pub fn register(&mut self, unit: Arc<dyn ExecutionUnit>) -> Result<(), RegistryError> {
        let name = UnitName::new(unit.name());
        if self.units.iter().any(|(n, _)| n == &name) {
            return Err(RegistryError::DuplicateUnit(name));
        }
        self.units.push((name, unit));
        Ok(())
    }

    /// Resolve a unit by name.
    pub fn resolve(&self, name: &UnitName) -> Result<Arc<dyn ExecutionUnit>, RegistryError> {
        self.units
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, unit)| Arc::clone(unit))
            .ok_or_else(|| RegistryError::UnknownUnit(name.clone()))
    }

    /// The configured default set, in declaration order.
    pub fn default_set(&self) -> Vec<UnitName> {
        self.units.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Core building blocks: identifiers, the gate decision logic, and the
//! execution unit contract.

pub mod gate;
pub mod types;
pub mod unit;

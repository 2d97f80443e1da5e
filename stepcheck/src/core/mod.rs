//! Deterministic, pure logic shared by the validator.
//!
//! Core modules are free of I/O side effects. They operate on the in-memory
//! suite arena and return deterministic outputs suitable for tests.

pub mod aggregate;
pub mod cache;
pub mod concept;
pub mod invariants;
pub mod model;
pub mod outcome;
pub mod table_range;
pub mod traverse;

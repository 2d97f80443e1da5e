//! I/O helpers for validation commands.

pub mod config;
pub mod protocol;
pub mod report;
pub mod runner;
pub mod suite_store;

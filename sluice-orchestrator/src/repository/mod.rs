//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Runs are held in memory for the lifetime of the process.

pub mod run;

// Re-export for convenience
pub use run as run_repository;
pub use run::{RunHandle, RunRepository};

//! Service Module
//!
//! Business logic layer for the orchestrator.
//! The pipeline engine drives runs held by the run repository.

pub mod run;
pub mod work;

// Re-export for convenience
pub use run as run_service;
pub use run::{PipelineEngine, RunError, Submission};
pub use work::{StageWork, TimedWork};

//! Core domain types
//!
//! The business entities shared between the orchestrator (which owns and
//! drives runs) and clients (which read run snapshots).

pub mod run;
pub mod stage;

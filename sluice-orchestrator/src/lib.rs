//! Sluice Orchestrator
//!
//! Runs the BUILD -> TEST -> DEPLOY pipeline simulation and serves it over
//! HTTP.
//!
//! Architecture:
//! - Repository: in-memory run storage with per-run locking
//! - Service: the pipeline engine and its stage work primitive
//! - API: axum handlers exposing start, retry and status operations
//! - Configuration: bind address and stage duration from the environment

pub mod api;
pub mod config;
pub mod repository;
pub mod service;

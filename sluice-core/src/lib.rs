//! Sluice Core
//!
//! Core types for the Sluice CI/CD run simulator.
//!
//! This crate contains:
//! - Domain types: runs and their BUILD/TEST/DEPLOY stages
//! - DTOs: request/response bodies for the orchestrator API

pub mod domain;
pub mod dto;

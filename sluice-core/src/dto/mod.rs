//! Data Transfer Objects
//!
//! Request and response bodies exchanged between the orchestrator's HTTP
//! surface and its clients.

pub mod run;

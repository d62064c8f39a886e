//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod run;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::PipelineEngine;

/// Create the main API router with all endpoints
pub fn create_router(engine: Arc<PipelineEngine>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Run endpoints
        .route("/pipeline/run", post(run::start_run))
        .route("/pipeline/list", get(run::list_runs))
        .route("/pipeline/{id}", get(run::get_run))
        .route("/pipeline/{id}/retry", post(run::retry_run))
        // Add state and middleware
        .with_state(engine)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

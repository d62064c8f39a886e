//! Health Check API Handler
//!
//! Simple health check endpoint for monitoring.

use axum::Json;
use sluice_core::dto::run::HealthStatus;

/// GET /health
/// Health check endpoint
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "OK".to_string(),
    })
}

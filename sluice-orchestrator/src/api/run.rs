//! Run API Handlers
//!
//! HTTP endpoints for starting, retrying and inspecting pipeline runs.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use sluice_core::domain::run::Run;
use sluice_core::dto::run::{RetryAccepted, RunCreated, RunSummary, StartRun};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::service::PipelineEngine;

/// POST /pipeline/run
/// Start a new run
///
/// The body is optional; an empty body starts a passing run.
pub async fn start_run(
    State(engine): State<Arc<PipelineEngine>>,
    body: Bytes,
) -> ApiResult<Json<RunCreated>> {
    let req = parse_start_request(&body)?;

    tracing::info!("Starting run (fail_test: {})", req.fail_test);

    let submission = engine.start_run(req.fail_test).await;

    Ok(Json(RunCreated {
        run_id: submission.run.id,
    }))
}

/// POST /pipeline/{id}/retry
/// Retry a failed run from the TEST stage
pub async fn retry_run(
    State(engine): State<Arc<PipelineEngine>>,
    Path(id): Path<String>,
) -> ApiResult<Json<RetryAccepted>> {
    tracing::info!("Retrying run: {}", id);

    let id = parse_run_id(&id)?;
    engine.retry_run(id).await?;

    Ok(Json(RetryAccepted::default()))
}

/// GET /pipeline/{id}
/// Get the current state of a run
pub async fn get_run(
    State(engine): State<Arc<PipelineEngine>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Run>> {
    let id = parse_run_id(&id)?;
    let run = engine.get_run(id).await?;

    Ok(Json(run))
}

/// GET /pipeline/list
/// List all runs, newest first
pub async fn list_runs(State(engine): State<Arc<PipelineEngine>>) -> Json<Vec<RunSummary>> {
    tracing::debug!("Listing all runs");

    let runs = engine.list_runs().await;

    Json(runs.iter().map(RunSummary::from).collect())
}

// =============================================================================
// Request Parsing
// =============================================================================

fn parse_start_request(body: &[u8]) -> ApiResult<StartRun> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartRun::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid run request: {}", e)))
}

/// Run IDs that are not UUIDs cannot exist, so they are reported as missing
fn parse_run_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("Pipeline {} not found", raw)))
}

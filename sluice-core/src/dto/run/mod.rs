//! Run DTOs for client/orchestrator communication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::run::{Run, RunStatus};
use crate::domain::stage::StageName;

/// Request to start a new run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRun {
    #[serde(default)]
    pub fail_test: bool,
}

/// Response to a start request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCreated {
    pub run_id: Uuid,
}

/// Response to an accepted retry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAccepted {
    pub accepted: bool,
    pub message: String,
}

impl Default for RetryAccepted {
    fn default() -> Self {
        Self {
            accepted: true,
            message: "Retry started".to_string(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Lightweight run summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub fail_test: bool,
    pub attempt: u32,
    pub current_stage: Option<StageName>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Run> for RunSummary {
    fn from(run: &Run) -> Self {
        Self {
            run_id: run.id,
            status: run.status,
            fail_test: run.fail_test,
            attempt: run.attempt,
            current_stage: run.running_stage(),
            created_at: run.created_at,
            updated_at: run.updated_at,
        }
    }
}

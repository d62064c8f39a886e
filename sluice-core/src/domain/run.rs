//! Run domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::stage::{Stage, StageName, StageStatus};

/// One execution instance of the BUILD -> TEST -> DEPLOY pipeline
///
/// Structure shared between the orchestrator (owns and mutates it) and
/// clients (read snapshots over HTTP).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    #[serde(rename = "runId")]
    pub id: Uuid,
    pub status: RunStatus,
    /// Makes TEST fail on the initial execution only
    pub fail_test: bool,
    /// 1 for the initial execution, bumped by every accepted retry
    pub attempt: u32,
    pub stages: [Stage; 3],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "RUNNING"),
            RunStatus::Success => write!(f, "SUCCESS"),
            RunStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl Run {
    /// Creates a running run with every stage pending
    pub fn new(fail_test: bool) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            status: RunStatus::Running,
            fail_test,
            attempt: 1,
            stages: StageName::ALL.map(Stage::new),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage(&self, name: StageName) -> &Stage {
        &self.stages[name.index()]
    }

    pub fn stage_mut(&mut self, name: StageName) -> &mut Stage {
        &mut self.stages[name.index()]
    }

    /// Stage currently executing, if any
    pub fn running_stage(&self) -> Option<StageName> {
        self.stages
            .iter()
            .find(|stage| stage.status == StageStatus::Running)
            .map(|stage| stage.name)
    }

    /// Records that the run was mutated
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

//! Stage domain types
//!
//! A stage is one phase of a run. Its status only moves forward through
//! [`Stage::transition`]; the single way back to `Pending` is [`Stage::reset`],
//! which the retry protocol uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of a pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageName {
    Build,
    Test,
    Deploy,
}

impl StageName {
    /// All stages in the order they execute
    pub const ALL: [StageName; 3] = [StageName::Build, StageName::Test, StageName::Deploy];

    /// Position of this stage within a run
    pub fn index(self) -> usize {
        match self {
            StageName::Build => 0,
            StageName::Test => 1,
            StageName::Deploy => 2,
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageName::Build => write!(f, "BUILD"),
            StageName::Test => write!(f, "TEST"),
            StageName::Deploy => write!(f, "DEPLOY"),
        }
    }
}

/// Execution status of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl StageStatus {
    /// Whether no further transition happens without a retry
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StageStatus::Success | StageStatus::Failed | StageStatus::Skipped
        )
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Pending => write!(f, "PENDING"),
            StageStatus::Running => write!(f, "RUNNING"),
            StageStatus::Success => write!(f, "SUCCESS"),
            StageStatus::Failed => write!(f, "FAILED"),
            StageStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Rejected stage status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal transition for stage {stage}: {from} -> {to}")]
pub struct TransitionError {
    pub stage: StageName,
    pub from: StageStatus,
    pub to: StageStatus,
}

/// One phase of a run with its own status and log stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub name: StageName,
    pub status: StageStatus,
    pub logs: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Stage {
    /// Creates a pending stage with no logs
    pub fn new(name: StageName) -> Self {
        Self {
            name,
            status: StageStatus::Pending,
            logs: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Moves the stage to `to`
    ///
    /// Allowed moves are `Pending -> Running`, `Pending -> Skipped`,
    /// `Running -> Success` and `Running -> Failed`. Anything else leaves the
    /// stage untouched and returns a [`TransitionError`].
    pub fn transition(&mut self, to: StageStatus) -> Result<(), TransitionError> {
        use StageStatus::*;

        let allowed = matches!(
            (self.status, to),
            (Pending, Running) | (Pending, Skipped) | (Running, Success) | (Running, Failed)
        );

        if !allowed {
            return Err(TransitionError {
                stage: self.name,
                from: self.status,
                to,
            });
        }

        let now = Utc::now();
        if to == Running {
            self.started_at = Some(now);
        }
        if to.is_terminal() {
            self.finished_at = Some(now);
        }
        self.status = to;

        Ok(())
    }

    /// Appends a line to the stage log
    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(message.into());
    }

    /// Returns the stage to `Pending` with an empty log
    pub fn reset(&mut self) {
        self.status = StageStatus::Pending;
        self.logs.clear();
        self.started_at = None;
        self.finished_at = None;
    }
}

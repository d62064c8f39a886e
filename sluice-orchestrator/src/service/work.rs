//! Stage work
//!
//! The engine does not do real work for a stage; it waits on a [`StageWork`]
//! implementation. This is the only place an execution task suspends.

use async_trait::async_trait;
use sluice_core::domain::stage::StageName;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Simulated work performed while a stage is running
#[async_trait]
pub trait StageWork: Send + Sync {
    /// Performs the work for `stage` of run `run_id`
    ///
    /// Must not block the executor thread; many runs wait concurrently.
    async fn perform(&self, run_id: Uuid, stage: StageName);
}

/// Timer-backed work that takes the same fixed duration for every stage
#[derive(Debug, Clone)]
pub struct TimedWork {
    duration: Duration,
}

impl TimedWork {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl StageWork for TimedWork {
    async fn perform(&self, run_id: Uuid, stage: StageName) {
        debug!("Run {} stage {} working for {:?}", run_id, stage, self.duration);
        tokio::time::sleep(self.duration).await;
    }
}

//! Run-related API endpoints

use crate::SluiceClient;
use crate::error::Result;
use sluice_core::domain::run::{Run, RunStatus};
use sluice_core::dto::run::{HealthStatus, RetryAccepted, RunCreated, RunSummary, StartRun};
use std::time::Duration;
use uuid::Uuid;

/// Shortest delay `wait_for_terminal` will poll with
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

impl SluiceClient {
    // =============================================================================
    // Run Lifecycle
    // =============================================================================

    /// Start a new run
    ///
    /// # Arguments
    /// * `fail_test` - Make the TEST stage fail on the initial execution
    ///
    /// # Returns
    /// The ID of the created run; execution continues in the background
    pub async fn start_run(&self, fail_test: bool) -> Result<RunCreated> {
        let response = self
            .client
            .post(self.url("/pipeline/run"))
            .json(&StartRun { fail_test })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Retry a failed run from the TEST stage
    ///
    /// Fails with a 400 API error if the run is not currently failed.
    pub async fn retry_run(&self, run_id: Uuid) -> Result<RetryAccepted> {
        let response = self
            .client
            .post(self.url(&format!("/pipeline/{}/retry", run_id)))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the current state of a run
    pub async fn get_run(&self, run_id: Uuid) -> Result<Run> {
        let response = self
            .client
            .get(self.url(&format!("/pipeline/{}", run_id)))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List all runs, newest first
    pub async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let response = self.client.get(self.url("/pipeline/list")).send().await?;

        self.handle_response(response).await
    }

    /// Check orchestrator health
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self.client.get(self.url("/health")).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Polling
    // =============================================================================

    /// Poll a run until it reaches a terminal status
    ///
    /// `on_update` is called with every snapshot fetched, including the final
    /// one, so callers can render live progress. Intervals shorter than
    /// [`MIN_POLL_INTERVAL`] are raised to it.
    ///
    /// # Arguments
    /// * `run_id` - The run to follow
    /// * `interval` - Delay between polls
    /// * `on_update` - Callback invoked with each snapshot
    pub async fn wait_for_terminal<F>(
        &self,
        run_id: Uuid,
        interval: Duration,
        mut on_update: F,
    ) -> Result<Run>
    where
        F: FnMut(&Run),
    {
        let mut ticker = tokio::time::interval(interval.max(MIN_POLL_INTERVAL));

        loop {
            ticker.tick().await;

            let run = self.get_run(run_id).await?;
            on_update(&run);

            if run.status != RunStatus::Running {
                tracing::debug!("Run {} reached {}", run_id, run.status);
                return Ok(run);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;

    #[tokio::test]
    async fn test_zero_interval_returns_request_error() {
        // Nothing listens on port 1
        let client = SluiceClient::new("http://127.0.0.1:1");

        let result = client
            .wait_for_terminal(Uuid::new_v4(), Duration::ZERO, |_| {})
            .await;

        assert!(matches!(result, Err(ClientError::RequestFailed(_))));
    }
}

//! Configuration module
//!
//! Handles CLI configuration including orchestrator URL and polling cadence.

use sluice_client::SluiceClient;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,
    /// Delay between polls when following a run
    pub poll_interval: Duration,
}

impl Config {
    /// Build a client pointed at the configured orchestrator
    pub fn client(&self) -> SluiceClient {
        SluiceClient::new(&self.orchestrator_url)
    }
}

//! Sluice HTTP Client
//!
//! A small, typed HTTP client for the Sluice orchestrator API, shared by the
//! CLI and anything else that needs to start, retry or follow runs.
//!
//! # Example
//!
//! ```no_run
//! use sluice_client::SluiceClient;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SluiceClient::new("http://localhost:4000");
//!
//!     let created = client.start_run(true).await?;
//!     let run = client
//!         .wait_for_terminal(created.run_id, Duration::from_secs(1), |_| {})
//!         .await?;
//!
//!     println!("Run {} finished: {}", run.id, run.status);
//!     Ok(())
//! }
//! ```

pub mod error;
mod runs;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use runs::MIN_POLL_INTERVAL;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Sluice orchestrator API
#[derive(Debug, Clone)]
pub struct SluiceClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:4000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl SluiceClient {
    /// Create a new orchestrator client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the orchestrator API (e.g., "http://localhost:4000")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Non-success statuses become [`ClientError::ApiError`] carrying the
    /// orchestrator's error message.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::from_body(status.as_u16(), &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

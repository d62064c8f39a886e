//! Orchestrator configuration
//!
//! Bind address and simulated stage duration, loaded from the environment
//! with fallback to defaults.

use std::time::Duration;

/// Default address the HTTP server binds to
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";

/// Default simulated work per stage
pub const DEFAULT_STAGE_DURATION: Duration = Duration::from_secs(3);

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address for the HTTP server (e.g., "0.0.0.0:4000")
    pub bind_addr: String,

    /// How long each stage's simulated work takes
    pub stage_duration: Duration,
}

impl Config {
    /// Creates a new configuration with the default stage duration
    pub fn new(bind_addr: String) -> Self {
        Self {
            bind_addr,
            stage_duration: DEFAULT_STAGE_DURATION,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables:
    /// - SLUICE_BIND_ADDR (optional, default: 0.0.0.0:4000)
    /// - PORT (optional, used as 0.0.0.0:$PORT when SLUICE_BIND_ADDR is unset)
    /// - SLUICE_STAGE_DURATION_MS (optional, milliseconds, default: 3000)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = match (lookup("SLUICE_BIND_ADDR"), lookup("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => {
                let port: u16 = port
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PORT must be a valid port number: {}", port))?;
                format!("0.0.0.0:{}", port)
            }
            (None, None) => DEFAULT_BIND_ADDR.to_string(),
        };

        let stage_duration = match lookup("SLUICE_STAGE_DURATION_MS") {
            Some(ms) => ms.parse::<u64>().map(Duration::from_millis).map_err(|_| {
                anyhow::anyhow!("SLUICE_STAGE_DURATION_MS must be a number of milliseconds")
            })?,
            None => DEFAULT_STAGE_DURATION,
        };

        Ok(Self {
            bind_addr,
            stage_duration,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.stage_duration.is_zero() {
            anyhow::bail!("stage_duration must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_BIND_ADDR.to_string())
    }
}

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sluice_orchestrator::api;
use sluice_orchestrator::config::Config;
use sluice_orchestrator::repository::RunRepository;
use sluice_orchestrator::service::{PipelineEngine, TimedWork};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sluice_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sluice Orchestrator...");

    let config = load_config()?;
    info!("Stage duration: {:?}", config.stage_duration);

    // Run storage lives for the whole process
    let repository = Arc::new(RunRepository::new());
    let work = Arc::new(TimedWork::new(config.stage_duration));
    let engine = Arc::new(PipelineEngine::new(repository, work));

    // Build router with all API endpoints
    let app = api::create_router(engine);

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            warn!("Failed to load config from environment ({}), using defaults", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

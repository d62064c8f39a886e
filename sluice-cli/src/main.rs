//! Sluice CLI
//!
//! Command-line interface for starting, retrying and following runs on the
//! Sluice orchestrator.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Sluice CI/CD Run Simulator CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(long, env = "SLUICE_URL", default_value = "http://localhost:4000")]
    url: String,

    /// Delay between polls when following a run, in milliseconds
    #[arg(long, env = "SLUICE_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.url,
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
    };

    handle_command(cli.command, &config).await
}

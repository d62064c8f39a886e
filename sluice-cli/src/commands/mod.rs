//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod run;

pub use run::RunCommands;

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run management
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Check orchestrator health
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run { command } => run::handle_run_command(command, config).await,
        Commands::Health => check_health(config).await,
    }
}

async fn check_health(config: &Config) -> Result<()> {
    let health = config.client().health().await?;

    println!(
        "{} {} at {}",
        "✓".green(),
        health.status.green().bold(),
        config.orchestrator_url.dimmed()
    );

    Ok(())
}

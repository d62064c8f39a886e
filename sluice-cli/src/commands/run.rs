//! Run command handlers
//!
//! Handles all run-related CLI commands including starting, retrying,
//! inspecting and following runs.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use sluice_client::SluiceClient;
use sluice_core::domain::run::{Run, RunStatus};
use sluice_core::domain::stage::{Stage, StageName, StageStatus};
use sluice_core::dto::run::RunSummary;
use uuid::Uuid;

use crate::config::Config;
use crate::id_resolver::resolve_run_id;
use crate::types::IdOrPrefix;

/// Run subcommands
#[derive(Subcommand)]
pub enum RunCommands {
    /// Start a new run
    Start {
        /// Make the TEST stage fail on the first attempt
        #[arg(long)]
        fail_test: bool,

        /// Follow the run until it finishes
        #[arg(short, long)]
        follow: bool,
    },
    /// Retry a failed run from the TEST stage
    Retry {
        /// Run ID or unambiguous prefix
        id: String,

        /// Follow the run until it finishes
        #[arg(short, long)]
        follow: bool,
    },
    /// Get run details
    Get {
        /// Run ID or unambiguous prefix
        id: String,
    },
    /// List all runs
    List,
    /// Follow a run until it finishes
    Watch {
        /// Run ID or unambiguous prefix
        id: String,
    },
}

/// Handle run commands
///
/// Routes run subcommands to their respective handlers.
pub async fn handle_run_command(command: RunCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        RunCommands::Start { fail_test, follow } => {
            start_run(&client, config, fail_test, follow).await
        }
        RunCommands::Retry { id, follow } => retry_run(&client, config, &id, follow).await,
        RunCommands::Get { id } => get_run(&client, &id).await,
        RunCommands::List => list_runs(&client).await,
        RunCommands::Watch { id } => {
            let run_id = resolve_run_id(&client, &IdOrPrefix::parse(&id)).await?;
            follow_run(&client, config, run_id).await
        }
    }
}

async fn start_run(
    client: &SluiceClient,
    config: &Config,
    fail_test: bool,
    follow: bool,
) -> Result<()> {
    let created = client.start_run(fail_test).await?;

    println!("{}", "✓ Run started".green().bold());
    println!("  ID: {}", created.run_id.to_string().cyan());
    if fail_test {
        println!("  {}", "TEST will fail on the first attempt".yellow());
    }

    if follow {
        println!();
        follow_run(client, config, created.run_id).await?;
    }

    Ok(())
}

async fn retry_run(client: &SluiceClient, config: &Config, id: &str, follow: bool) -> Result<()> {
    let run_id = resolve_run_id(client, &IdOrPrefix::parse(id)).await?;
    let accepted = client.retry_run(run_id).await?;

    println!("{}", format!("✓ {}", accepted.message).green().bold());
    println!("  ID: {}", run_id.to_string().cyan());

    if follow {
        println!();
        follow_run(client, config, run_id).await?;
    }

    Ok(())
}

async fn get_run(client: &SluiceClient, id: &str) -> Result<()> {
    let run_id = resolve_run_id(client, &IdOrPrefix::parse(id)).await?;
    let run = client.get_run(run_id).await?;

    print_run_details(&run);

    Ok(())
}

async fn list_runs(client: &SluiceClient) -> Result<()> {
    let runs = client.list_runs().await?;

    if runs.is_empty() {
        println!("{}", "No runs found.".yellow());
    } else {
        println!("{}", format!("Found {} run(s):", runs.len()).bold());
        println!();
        for run in runs {
            print_run_summary(&run);
        }
    }

    Ok(())
}

/// Poll a run and print stage transitions and new log lines as they appear
async fn follow_run(client: &SluiceClient, config: &Config, run_id: Uuid) -> Result<()> {
    println!("{}", format!("Following run {}:", run_id).bold());
    println!("{}", "─".repeat(80).dimmed());

    let mut tracker = ProgressTracker::default();
    let run = client
        .wait_for_terminal(run_id, config.poll_interval, |run| {
            for event in tracker.observe(run) {
                print_event(&event);
            }
        })
        .await?;

    println!("{}", "─".repeat(80).dimmed());
    println!("Run finished: {}", colorize_run_status(run.status).bold());
    if run.status == RunStatus::Failed {
        println!(
            "{}",
            format!("  Retry with: sluice run retry {}", run.id).dimmed()
        );
    }

    Ok(())
}

/// Something that changed between two snapshots of a run
#[derive(Debug, Clone, PartialEq)]
enum ProgressEvent {
    Stage(StageName, StageStatus),
    Log(StageName, String),
    Run(RunStatus),
}

/// Remembers what has already been printed for a followed run
#[derive(Debug, Default)]
struct ProgressTracker {
    run_status: Option<RunStatus>,
    stage_status: [Option<StageStatus>; 3],
    printed_logs: [usize; 3],
}

impl ProgressTracker {
    /// Compare a new snapshot against what was seen so far
    fn observe(&mut self, run: &Run) -> Vec<ProgressEvent> {
        let mut events = Vec::new();

        for stage in &run.stages {
            let i = stage.name.index();

            // Announce the transition before the lines it produced
            if self.stage_status[i] != Some(stage.status) {
                self.stage_status[i] = Some(stage.status);
                if stage.status != StageStatus::Pending || !stage.logs.is_empty() {
                    events.push(ProgressEvent::Stage(stage.name, stage.status));
                }
            }

            for line in &stage.logs[self.printed_logs[i]..] {
                events.push(ProgressEvent::Log(stage.name, line.clone()));
            }
            self.printed_logs[i] = stage.logs.len();
        }

        if self.run_status != Some(run.status) {
            self.run_status = Some(run.status);
            if run.status.is_terminal() {
                events.push(ProgressEvent::Run(run.status));
            }
        }

        events
    }
}

fn print_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::Stage(name, status) => {
            println!(
                "  {} {:<7} {}",
                "▸".cyan(),
                name.to_string().bold(),
                colorize_stage_status(*status)
            );
        }
        ProgressEvent::Log(name, line) => {
            println!("    {} {}", format!("[{}]", name).dimmed(), line);
        }
        ProgressEvent::Run(status) => {
            println!("  {} {}", "■".bold(), colorize_run_status(*status));
        }
    }
}

/// Print a one-entry run summary
fn print_run_summary(run: &RunSummary) {
    println!("  {} Run {}", "▸".cyan(), run.run_id.to_string().dimmed());
    println!("    Status:   {}", colorize_run_status(run.status));
    if let Some(stage) = run.current_stage {
        println!("    Stage:    {}", stage.to_string().cyan());
    }
    println!("    Attempt:  {}", run.attempt);
    println!(
        "    Created:  {}",
        run.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed run information including every stage's logs
fn print_run_details(run: &Run) {
    println!("{}", "Run Details:".bold());
    println!("  ID:        {}", run.id.to_string().cyan());
    println!("  Status:    {}", colorize_run_status(run.status));
    println!("  Fail test: {}", run.fail_test);
    println!("  Attempt:   {}", run.attempt);
    println!("  Created:   {}", run.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:   {}", run.updated_at.format("%Y-%m-%d %H:%M:%S"));

    println!("\n{}", "Stages:".bold());
    for stage in &run.stages {
        print_stage(stage);
    }
}

fn print_stage(stage: &Stage) {
    print!(
        "  {} {:<7} {}",
        "▸".cyan(),
        stage.name.to_string().bold(),
        colorize_stage_status(stage.status)
    );
    if let (Some(started), Some(finished)) = (stage.started_at, stage.finished_at) {
        let millis = finished.signed_duration_since(started).num_milliseconds();
        print!(" {}", format!("({:.1}s)", millis as f64 / 1000.0).dimmed());
    }
    println!();

    for line in &stage.logs {
        println!("      {}", line);
    }
}

fn colorize_run_status(status: RunStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        RunStatus::Running => status_str.cyan(),
        RunStatus::Success => status_str.green(),
        RunStatus::Failed => status_str.red(),
    }
}

fn colorize_stage_status(status: StageStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        StageStatus::Pending => status_str.dimmed(),
        StageStatus::Running => status_str.cyan(),
        StageStatus::Success => status_str.green(),
        StageStatus::Failed => status_str.red(),
        StageStatus::Skipped => status_str.yellow(),
    }
}

//! Oakbot CLI - autonomous Pokémon agent kernel.
//!
//! Single binary that provides:
//! - `oakbot run` - headless agent execution against the stub emulator
//! - `oakbot status` - recent failsafe events and session state

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use oakbot_core::{
    AgentConfig, EventEmitter, Scheduler, ScriptedEmulator, StopCondition, StubPerception,
};

#[derive(Parser)]
#[command(name = "oakbot")]
#[command(about = "Autonomous Pokémon agent kernel", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent
    Run {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Run as fast as the pipeline allows instead of pacing to the
        /// emulator frame rate
        #[arg(long)]
        turbo: bool,
    },

    /// Show recent agent events
    Status {
        /// Number of events to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let project_root = match cli.project {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Some(Commands::Run { ticks, turbo }) => run_agent(&project_root, ticks, turbo).await,
        Some(Commands::Status { limit }) => show_status(&project_root, limit),
        None => {
            println!("Oakbot - Autonomous Pokémon Agent");
            println!();
            println!("Usage: oakbot <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run      Run the agent");
            println!("  status   Show recent agent events");
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_agent(project_root: &PathBuf, ticks: Option<u64>, turbo: bool) -> Result<ExitCode> {
    let mut config = AgentConfig::load_from_project(project_root)?;
    config.resolve_paths(project_root);
    if turbo {
        config.tick.realtime = false;
    }

    let mut scheduler = Scheduler::new(
        config,
        Box::new(ScriptedEmulator::new()),
        Box::new(StubPerception::new()),
    )?;

    let handle = scheduler.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.request_stop("interrupted");
        }
    });

    let until = match ticks {
        Some(max) => StopCondition::ticks(max),
        None => StopCondition::unbounded(),
    };
    let summary = scheduler.run(until).await?;

    println!("{}", summary.summary());
    Ok(ExitCode::from(summary.stop.exit_code() as u8))
}

fn show_status(project_root: &PathBuf, limit: usize) -> Result<ExitCode> {
    let mut config = AgentConfig::load_from_project(project_root)?;
    config.resolve_paths(project_root);

    let events = EventEmitter::new(&config.events_path).read_recent(limit);
    if events.is_empty() {
        println!("No recorded events.");
        return Ok(ExitCode::SUCCESS);
    }

    for event in events {
        println!(
            "{} tick {:>8} {:?} {} {}",
            event.timestamp.format("%H:%M:%S"),
            event.tick_id,
            event.kind,
            event.path.as_deref().unwrap_or("-"),
            event.reason
        );
    }
    Ok(ExitCode::SUCCESS)
}

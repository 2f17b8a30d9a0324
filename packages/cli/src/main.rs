mod commands;
mod config;
mod store;

use std::path::Path;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, init, open, replay, save, sync, view, ApplyArgs, InitArgs, OpenArgs, ReplayArgs,
    SaveArgs, SyncArgs, ViewArgs,
};
use config::Config;
use manuscript_io::SafetyMode;
use tracing_subscriber::EnvFilter;

/// Manuscript CLI - deterministic document core for long-form writing
#[derive(Parser, Debug)]
#[command(name = "manuscript")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Override the configured safety mode (durable, atomic)
    #[arg(long, global = true)]
    safety_mode: Option<SafetyMode>,

    /// Override the configured number of recovery snapshots
    #[arg(long, global = true)]
    max_snapshots: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new manuscript project
    Init(InitArgs),

    /// Apply local commands and record them in the event log
    Apply(ApplyArgs),

    /// Apply a batch of remote events
    Sync(SyncArgs),

    /// Verify that the event log reproduces the saved state
    Replay(ReplayArgs),

    /// Export a scene to a markdown file
    Save(SaveArgs),

    /// Open a markdown file, recovering from snapshots if needed
    Open(OpenArgs),

    /// Print a derived view of the current state
    View(ViewArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MANUSCRIPT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, cwd: &Path) -> anyhow::Result<()> {
    let config = Config::load(cwd)?.with_overrides(cli.safety_mode, cli.max_snapshots);

    match cli.command {
        Command::Init(args) => init(args, cwd, &config),
        Command::Apply(args) => apply(args, cwd, &config),
        Command::Sync(args) => sync(args, cwd, &config),
        Command::Replay(args) => replay(args, cwd, &config),
        Command::Save(args) => save(args, cwd, &config),
        Command::Open(args) => open(args, cwd, &config),
        Command::View(args) => view(args, cwd, &config),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| run(cli, &cwd));

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

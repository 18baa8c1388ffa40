//! buildlog: sync construction-project photos into git branches.
//!
//! # Usage
//!
//! ```text
//! buildlog sync [--dry-run]
//! buildlog plan
//! buildlog status [--json]
//! ```
//!
//! Global options: `--repo <dir>`, `--config <file>`, `--verbose`, `--log-json`.

mod commands;
mod github;
mod local_source;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{plan::PlanArgs, status::StatusArgs, sync::SyncArgs, GlobalOpts};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "buildlog",
    version,
    about = "Sync construction-project photo albums into git branches and tracking issues",
    long_about = None,
)]
struct Cli {
    /// Repository root.
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Config file (default: `<repo>/buildlog.yaml` when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reconciliation pass over every album.
    Sync(SyncArgs),

    /// Show what `sync` would do without changing anything.
    Plan(PlanArgs),

    /// Show tracked projects from the state file.
    Status(StatusArgs),
}

fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let opts = GlobalOpts {
        repo: cli.repo,
        config: cli.config,
    };
    match cli.command {
        Commands::Sync(args) => args.run(&opts),
        Commands::Plan(args) => args.run(&opts),
        Commands::Status(args) => args.run(&opts),
    }
}

//! `comtab` CLI entry point.
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! The same pipeline the API serves, runnable from a terminal or cron.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use comtab_cli::promote::{self, PromoteArgs};
use comtab_cli::update::{self, UpdateArgs};

/// Commissioning table updater.
///
/// Compares a bank's product report against the internal commissioning
/// table and writes the delta spreadsheet; maintains the standardization
/// dictionary from reviewed suggestions.
#[derive(Parser, Debug)]
#[command(name = "comtab", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an update: read both spreadsheets, diff, write the delta.
    Update(UpdateArgs),

    /// Promote reviewed suggestions into the dictionary.
    Promote(PromoteArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Update(args) => update::run(&args).await,
        Commands::Promote(args) => promote::run(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

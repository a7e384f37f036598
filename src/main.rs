//! stepdriver - runs spec scenarios against a step-implementation runner
//!
//! Reads a spec document, drives the runner through every scenario's hooks
//! and steps, and reports the results.

use clap::Parser;
use stepdriver::{cli, commands, common::logging};
use commands::Commands;

#[derive(Parser)]
#[command(name = "stepdriver", about = "Scenario execution engine")]
#[command(version, long_about = None)]
struct Cli {
    /// Also write logs to the log file in the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.log_file {
        if let Some(path) = logging::init_file() {
            tracing::debug!(path = %path.display(), "Logging to file");
        }
    } else {
        logging::init_cli();
    }

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

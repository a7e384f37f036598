//! CLI command definitions
//!
//! Defines the clap commands for the stepdriver CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Execute the scenarios of a spec document
    Run {
        /// Path to the YAML spec document
        spec: PathBuf,

        /// Runner executable (overrides the config file)
        #[arg(long)]
        runner: Option<String>,

        /// Arguments to pass to the runner
        #[arg(last = true)]
        runner_args: Vec<String>,

        /// Number of parallel streams
        #[arg(long, short = 'n')]
        streams: Option<usize>,

        /// Ask for the outcome of unimplemented steps on the terminal
        #[arg(long)]
        manual: bool,

        /// Print the spec result as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Print each step as it finishes
        #[arg(long, short)]
        verbose: bool,
    },

    /// Check a spec document and list its validation errors
    Validate {
        /// Path to the YAML spec document
        spec: PathBuf,
    },
}

//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Test run orchestrator with live notifications and report merging
#[derive(Parser, Debug)]
#[command(name = "run-relay")]
#[command(version)]
#[command(about = "Run test modules, relay progress to a subscriber and merge reports")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the configured test modules
    Run(RunArgs),

    /// Merge per-run artifacts into one report
    Merge(MergeArgs),

    /// Render the merged report again from its persisted JSON
    Render(MergeArgs),

    /// List configured test modules
    List,
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Execution mode; `CI` (leading dashes ignored) closes the host window
    /// once the run completes
    #[arg(allow_hyphen_values = true)]
    pub mode: Option<String>,
}

/// Arguments for merge and render commands
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Label appended to the project name in the report title
    #[arg(allow_hyphen_values = true)]
    pub context: Option<String>,
}

//! Command-line interface definitions.

use crate::core::Severity;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "codesweep",
    about = "Static analysis orchestration across languages and tools",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a repository directory and report aggregated findings
    Analyze {
        /// Path to the repository root
        path: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
        output: OutputFormat,

        /// Per-tool timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,

        /// Maximum concurrent tool invocations
        #[arg(long)]
        jobs: Option<usize>,

        /// Drop issues below this severity
        #[arg(long, default_value = "info")]
        min_severity: Severity,

        /// Additional glob patterns to exclude (repeatable)
        #[arg(long = "exclude")]
        excludes: Vec<String>,

        /// Restrict to these tools (repeatable; default: all)
        #[arg(long = "tool")]
        tools: Vec<String>,

        /// Also print the run's event trace
        #[arg(long)]
        events: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Summary,
}

//! CLI command definitions for the `docchat` binary.
//!
//! Running without a subcommand starts the chat loop.

pub mod chat;
pub mod ingest;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

/// Ask questions about a local document collection.
#[derive(Parser)]
#[command(name = "docchat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file. A missing file means built-in defaults.
    #[arg(long, global = true, env = "DOCCHAT_CONFIG", default_value = "docchat.toml")]
    pub config: PathBuf,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed logs on stderr (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export tracing spans through OpenTelemetry to stdout.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive question loop (the default).
    Chat,

    /// Load, split and embed a directory of documents into the index.
    Ingest {
        /// Directory to scan for .txt, .md, .html and .pdf files.
        dir: PathBuf,

        /// Drop the existing table before ingesting.
        #[arg(long)]
        rebuild: bool,
    },
}

/// Cyan spinner with a message, ticking until cleared.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

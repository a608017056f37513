//! docchat entry point.
//!
//! Binary name: `docchat`
//!
//! Parses CLI arguments, sets up tracing, then either runs the interactive
//! question loop or ingests a directory into the vector index.

mod cli;
mod state;

use clap::Parser;

use cli::{Cli, Commands};
use docchat_infra::config::load_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,docchat=debug",
        _ => "trace",
    };
    docchat_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let config = load_config(&cli.config).await;

    let outcome = match cli.command {
        None | Some(Commands::Chat) => cli::chat::run_chat(&config).await,
        Some(Commands::Ingest { dir, rebuild }) => cli::ingest::run_ingest(&config, &dir, rebuild).await,
    };

    docchat_observe::tracing_setup::shutdown_tracing();
    outcome
}

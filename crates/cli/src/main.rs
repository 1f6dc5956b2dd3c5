//! `mail-dispatch` binary entry point.

mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use observability::{ObservabilityConfig, Verbosity};
use tracing::{debug, error};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.verbose),
        // Per-command `--metrics-port` installs the exporter later
        metrics_port: None,
    })?;
    debug!(version = env!("CARGO_PKG_VERSION"), "mail-dispatch starting");

    let result = match &cli.command {
        Commands::Send(args) => commands::run_send(args).await,
        Commands::Batch(args) => commands::run_batch(args).await,
        Commands::Validate(args) => commands::run_validate(args),
        Commands::Info(args) => commands::run_info(args),
        Commands::Init(args) => commands::run_init(args),
    };

    if let Err(ref e) = result {
        error!(error = %e, "Command failed");
    }
    result
}

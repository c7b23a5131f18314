use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use hostcap_cli::cli::{Cli, Commands};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;

fn init_tracing(level: tracing::Level) -> Result<()> {
    let builder = FmtSubscriber::builder().with_writer(io::stderr);
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())
        }
        Err(_) => tracing::subscriber::set_global_default(builder.with_max_level(level).finish()),
    }
    .context("setting default subscriber failed")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level)?;

    match &cli.command {
        Commands::Reinforce {
            case,
            config,
            mode,
            timeseries,
            snapshots,
            out,
        } => commands::reinforce::handle(
            case,
            config.as_deref(),
            mode.as_deref(),
            timeseries.as_deref(),
            snapshots.as_ref(),
            out,
        ),
        Commands::Translate {
            case,
            mode,
            timeseries,
            snapshots,
            config,
            out,
        } => commands::translate::handle(
            case,
            mode,
            timeseries.as_deref(),
            snapshots.as_ref(),
            config.as_deref(),
            out,
        ),
        Commands::WorstCase { case, config, out } => {
            commands::worst_case::handle(case, config.as_deref(), out)
        }
    }
}

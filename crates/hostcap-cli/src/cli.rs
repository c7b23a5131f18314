use clap::{Parser, Subcommand};
use hostcap_core::SnapshotRange;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Grid topology translation, power flow and reinforcement", long_about = None)]
pub struct Cli {
    /// Set the logging level (overridden by RUST_LOG when set)
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reinforce a grid until all technical limits hold
    Reinforce {
        /// Case file (JSON with `topology` and `catalog`)
        #[arg(long)]
        case: PathBuf,
        /// Reinforcement config (YAML, JSON or TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Analysis mode: full, mv-only or lv-only (overrides the config)
        #[arg(long)]
        mode: Option<String>,
        /// Directory of measured/forecast series; worst case when omitted
        #[arg(long)]
        timeseries: Option<PathBuf>,
        /// Snapshot window as `start..end` or `start..=end`, epoch seconds or
        /// RFC 3339 (overrides the config)
        #[arg(long)]
        snapshots: Option<SnapshotRange>,
        /// Output directory
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },
    /// Write the solver tables of a case as Parquet
    Translate {
        #[arg(long)]
        case: PathBuf,
        #[arg(long, default_value = "mv-only")]
        mode: String,
        #[arg(long)]
        timeseries: Option<PathBuf>,
        /// Snapshot window as `start..end` or `start..=end`
        #[arg(long)]
        snapshots: Option<SnapshotRange>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },
    /// Synthesize the worst-case series of a case
    WorstCase {
        #[arg(long)]
        case: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output JSON file
        #[arg(long)]
        out: PathBuf,
    },
}

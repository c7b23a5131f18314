use std::path::Path;

use anyhow::{Context, Result};
use hostcap_core::Topology;
use hostcap_ts::{load_csv_dir, worst_case, TimeSeries, WorstCaseConfig};
use tracing::info;

pub mod reinforce;
pub mod translate;
pub mod worst_case;

/// Literal series from `dir`, or the synthesized worst case.
fn series_for(
    topology: &Topology,
    dir: Option<&Path>,
    config: &WorstCaseConfig,
) -> Result<TimeSeries> {
    match dir {
        Some(dir) => {
            info!("Loading time series from {}", dir.display());
            let series = load_csv_dir(dir, topology)?;
            series
                .validate_against(topology)
                .context("time series does not cover the topology")?;
            Ok(series)
        }
        None => {
            info!("Synthesizing worst-case series");
            Ok(worst_case(topology, config)?)
        }
    }
}

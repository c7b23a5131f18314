use std::path::Path;

use anyhow::Result;
use hostcap_algo::{io::write_tables, AnalysisMode, Translator};
use hostcap_core::SnapshotRange;
use tracing::info;

use super::series_for;
use hostcap_cli::case::{load_config, Case};

pub fn handle(
    case: &Path,
    mode: &str,
    timeseries: Option<&Path>,
    snapshots: Option<&SnapshotRange>,
    config: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let mode: AnalysisMode = mode.parse()?;
    let Case {
        mut topology,
        catalog,
    } = Case::load(case)?;
    let config = load_config(config)?;
    let translator = Translator::new(&catalog).with_frequency(config.system_frequency_hz);
    let defaulted = translator.resolve_missing_parameters(&mut topology)?;
    if !defaulted.is_empty() {
        info!("Defaulted parameters of {} component(s)", defaulted.len());
    }
    let series = series_for(&topology, timeseries, &config.worst_case)?;
    let range = snapshots.copied().unwrap_or(config.snapshots);
    let tables = translator.to_tables(&topology, &series, mode, &range)?;
    write_tables(&tables, out)?;
    println!(
        "Translated {} ({}, {} snapshot(s)): {} buses, {} lines, {} transformers, {} loads, {} generators -> {}",
        topology.name(),
        mode,
        tables.snapshots.len(),
        tables.buses.len(),
        tables.lines.len(),
        tables.transformers.len(),
        tables.loads.len(),
        tables.generators.len(),
        out.display()
    );
    Ok(())
}

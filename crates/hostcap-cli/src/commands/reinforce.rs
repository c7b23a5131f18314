use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use hostcap_algo::{io::write_results, AnalysisMode};
use hostcap_core::SnapshotRange;
use hostcap_dist::{write_reinforcements, ReinforceError, ReinforcementEngine, ReinforcementReport};
use tracing::{error, info};

use super::series_for;
use hostcap_cli::case::{load_config, Case};

pub fn handle(
    case: &Path,
    config: Option<&Path>,
    mode: Option<&str>,
    timeseries: Option<&Path>,
    snapshots: Option<&SnapshotRange>,
    out: &Path,
) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(mode) = mode {
        config.mode = mode.parse::<AnalysisMode>()?;
    }
    if let Some(range) = snapshots {
        config.snapshots = *range;
    }
    let Case {
        mut topology,
        catalog,
    } = Case::load(case)?;
    let series = series_for(&topology, timeseries, &config.worst_case)?;
    info!(
        "Reinforcing {} ({} mode, {} snapshot(s), window {})",
        topology.name(),
        config.mode,
        series.len(),
        config.snapshots
    );

    let engine = ReinforcementEngine::new(&catalog, config);
    let outcome = engine.run(&mut topology, &series);
    let report = match &outcome {
        Ok(report) => report,
        Err(ReinforceError::Stalled(report)) => &**report,
        Err(err) => {
            error!("Reinforcement failed: {err}");
            bail!("reinforcement of '{}' failed: {err}", case.display());
        }
    };
    fs::create_dir_all(out)
        .with_context(|| format!("creating output directory '{}'", out.display()))?;
    write_outputs(report, out)?;
    if outcome.is_ok() {
        let analysis = engine.analyze(&topology, &series)?;
        write_results(&analysis.results, &out.join("results.parquet"))?;
    }
    drop(engine);
    Case { topology, catalog }.save(&out.join("case.json"))?;

    match outcome {
        Ok(report) => {
            println!(
                "Reinforcement converged after {} iteration(s): {} measure(s) applied -> {}",
                report.iterations,
                report.applied.len(),
                out.display()
            );
            Ok(())
        }
        Err(err) => {
            error!("{err}");
            bail!("{err}");
        }
    }
}

fn write_outputs(report: &ReinforcementReport, out: &Path) -> Result<()> {
    write_reinforcements(report, &out.join("reinforcements.parquet"))?;
    let json = serde_json::to_string_pretty(report).context("serializing report")?;
    fs::write(out.join("report.json"), json).context("writing report.json")?;
    Ok(())
}

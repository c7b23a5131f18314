use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::series_for;
use hostcap_cli::case::{load_config, Case};

pub fn handle(case: &Path, config: Option<&Path>, out: &Path) -> Result<()> {
    let case = Case::load(case)?;
    let config = load_config(config)?;
    let series = series_for(&case.topology, None, &config.worst_case)?;
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&series).context("serializing time series")?;
    fs::write(out, json).with_context(|| format!("writing '{}'", out.display()))?;
    info!("Wrote worst-case series to {}", out.display());
    println!(
        "Worst case: {} snapshot(s), {} load(s), {} generator(s) -> {}",
        series.len(),
        series.loads().count(),
        series.generators().count(),
        out.display()
    );
    Ok(())
}

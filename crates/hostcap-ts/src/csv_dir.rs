use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use hostcap_core::{GeneratorId, LoadId, Snapshot, Topology};
use polars::prelude::*;
use tracing::info;

use crate::{PowerSeries, TimeSeries};

const TIMESTAMP_COLUMN: &str = "timestamp";

/// One wide CSV file: timestamps plus one value column per component name.
struct WideFrame {
    snapshots: Vec<Snapshot>,
    columns: HashMap<String, Vec<f64>>,
}

fn read_wide_csv(path: &Path) -> Result<WideFrame> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let df = CsvReader::new(&mut file)
        .has_header(true)
        .finish()
        .with_context(|| format!("reading CSV file {}", path.display()))?;

    let timestamps = df
        .column(TIMESTAMP_COLUMN)
        .with_context(|| format!("{} has no '{}' column", path.display(), TIMESTAMP_COLUMN))?
        .cast(&DataType::Int64)
        .context("casting timestamp column to Int64")?;
    let mut snapshots = Vec::with_capacity(df.height());
    for ts in timestamps.i64()?.into_iter() {
        let secs = ts.ok_or_else(|| anyhow!("{}: empty timestamp", path.display()))?;
        let snapshot = Snapshot::from_epoch_seconds(secs)
            .ok_or_else(|| anyhow!("{}: timestamp {} out of range", path.display(), secs))?;
        snapshots.push(snapshot);
    }

    let mut columns = HashMap::new();
    for name in df.get_column_names() {
        if name == TIMESTAMP_COLUMN {
            continue;
        }
        let series = df
            .column(name)?
            .cast(&DataType::Float64)
            .with_context(|| format!("casting column '{name}' to Float64"))?;
        let values = series
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| {
                    anyhow!(
                        "{}: empty value in column '{name}' at row {} (timestamp {})",
                        path.display(),
                        row + 1,
                        snapshots[row].epoch_seconds()
                    )
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        columns.insert(name.to_string(), values);
    }
    Ok(WideFrame { snapshots, columns })
}

fn name_index<I: Copy>(names: impl Iterator<Item = (String, I)>) -> Result<HashMap<String, I>> {
    let mut index = HashMap::new();
    for (name, id) in names {
        if index.insert(name.clone(), id).is_some() {
            bail!("component name '{name}' is not unique; time series columns are matched by name");
        }
    }
    Ok(index)
}

/// Read literal series from a directory of wide CSV files.
///
/// Expects `generators_active_power.csv` and `loads_active_power.csv`; the
/// `*_reactive_power.csv` counterparts are optional and default to zero.
/// Every file needs a `timestamp` column (epoch seconds) plus one column per
/// component, named like the component. All files must share the same
/// timestamps.
pub fn load_csv_dir(dir: &Path, topology: &Topology) -> Result<TimeSeries> {
    let gen_index = name_index(topology.generators().map(|g| (g.name.clone(), g.id)))?;
    let load_index = name_index(topology.loads().map(|l| (l.name.clone(), l.id)))?;

    let gen_p = read_wide_csv(&dir.join("generators_active_power.csv"))?;
    let load_p = read_wide_csv(&dir.join("loads_active_power.csv"))?;
    if gen_p.snapshots != load_p.snapshots {
        bail!("generator and load active power files cover different timestamps");
    }
    let gen_q = read_optional(&dir.join("generators_reactive_power.csv"), &gen_p.snapshots)?;
    let load_q = read_optional(&dir.join("loads_reactive_power.csv"), &gen_p.snapshots)?;

    let mut ts = TimeSeries::new(gen_p.snapshots.clone())?;
    let zeros = vec![0.0; ts.len()];

    for (name, p) in gen_p.columns {
        let id: GeneratorId = *gen_index
            .get(&name)
            .ok_or_else(|| anyhow!("unknown generator column '{name}'"))?;
        let q = gen_q
            .as_ref()
            .and_then(|f| f.columns.get(&name).cloned())
            .unwrap_or_else(|| zeros.clone());
        ts.insert_generator(id, PowerSeries::new(p, q))?;
    }
    for (name, p) in load_p.columns {
        let id: LoadId = *load_index
            .get(&name)
            .ok_or_else(|| anyhow!("unknown load column '{name}'"))?;
        let q = load_q
            .as_ref()
            .and_then(|f| f.columns.get(&name).cloned())
            .unwrap_or_else(|| zeros.clone());
        ts.insert_load(id, PowerSeries::new(p, q))?;
    }

    info!(
        snapshots = ts.len(),
        dir = %dir.display(),
        "loaded time series from CSV"
    );
    Ok(ts)
}

fn read_optional(path: &Path, snapshots: &[Snapshot]) -> Result<Option<WideFrame>> {
    if !path.exists() {
        return Ok(None);
    }
    let frame = read_wide_csv(path)?;
    if frame.snapshots != snapshots {
        bail!("{} covers different timestamps", path.display());
    }
    Ok(Some(frame))
}

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use hostcap_core::ComponentRef;
use polars::prelude::{DataFrame, NamedFrom, ParquetCompression, ParquetWriter, Series};

use crate::results::PowerFlowResults;
use crate::tables::{InjectionRow, SolverTables};

/// Write `df` as a Snappy-compressed Parquet file, creating parent directories.
pub fn persist_dataframe(df: &mut DataFrame, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }
    let mut file = File::create(output)
        .with_context(|| format!("creating Parquet output '{}'", output.display()))?;
    ParquetWriter::new(&mut file)
        .with_compression(ParquetCompression::Snappy)
        .finish(df)
        .with_context(|| format!("writing Parquet table {}", output.display()))?;
    Ok(())
}

fn injection_frame(rows: &[InjectionRow], snapshots: &[i64]) -> Result<DataFrame> {
    let mut keys = Vec::new();
    let mut buses = Vec::new();
    let mut timestamps = Vec::new();
    let mut p = Vec::new();
    let mut q = Vec::new();
    for row in rows {
        for (t, &ts) in snapshots.iter().enumerate() {
            keys.push(row.key.clone());
            buses.push(row.bus.clone());
            timestamps.push(ts);
            p.push(row.p_set[t]);
            q.push(row.q_set[t]);
        }
    }
    Ok(DataFrame::new(vec![
        Series::new("key", keys),
        Series::new("bus", buses),
        Series::new("timestamp", timestamps),
        Series::new("p_set", p),
        Series::new("q_set", q),
    ])?)
}

/// One Parquet file per table: `buses`, `lines`, `transformers`, `loads`
/// and `generators` (the latter two in long format, one row per snapshot).
pub fn write_tables(tables: &SolverTables, dir: &Path) -> Result<()> {
    let snapshots: Vec<i64> = tables.snapshots.iter().map(|s| s.epoch_seconds()).collect();

    let mut buses = DataFrame::new(vec![
        Series::new("key", tables.buses.iter().map(|b| b.key.clone()).collect::<Vec<_>>()),
        Series::new("v_nom_kv", tables.buses.iter().map(|b| b.v_nom_kv).collect::<Vec<_>>()),
        Series::new(
            "level",
            tables.buses.iter().map(|b| b.level.as_str()).collect::<Vec<_>>(),
        ),
        Series::new("is_slack", tables.buses.iter().map(|b| b.is_slack).collect::<Vec<_>>()),
    ])?;
    persist_dataframe(&mut buses, &dir.join("buses.parquet"))?;

    let lines = &tables.lines;
    let mut lines_df = DataFrame::new(vec![
        Series::new("key", lines.iter().map(|l| l.key.clone()).collect::<Vec<_>>()),
        Series::new("bus0", lines.iter().map(|l| l.bus0.clone()).collect::<Vec<_>>()),
        Series::new("bus1", lines.iter().map(|l| l.bus1.clone()).collect::<Vec<_>>()),
        Series::new("length_km", lines.iter().map(|l| l.length_km).collect::<Vec<_>>()),
        Series::new("r_ohm", lines.iter().map(|l| l.r_ohm).collect::<Vec<_>>()),
        Series::new("x_ohm", lines.iter().map(|l| l.x_ohm).collect::<Vec<_>>()),
        Series::new("s_nom_mva", lines.iter().map(|l| l.s_nom_mva).collect::<Vec<_>>()),
        Series::new("num_parallel", lines.iter().map(|l| l.num_parallel).collect::<Vec<_>>()),
        Series::new(
            "std_type",
            lines
                .iter()
                .map(|l| l.std_type.clone().unwrap_or_default())
                .collect::<Vec<_>>(),
        ),
    ])?;
    persist_dataframe(&mut lines_df, &dir.join("lines.parquet"))?;

    let transformers = &tables.transformers;
    let mut transformers_df = DataFrame::new(vec![
        Series::new("key", transformers.iter().map(|t| t.key.clone()).collect::<Vec<_>>()),
        Series::new("bus0", transformers.iter().map(|t| t.bus0.clone()).collect::<Vec<_>>()),
        Series::new("bus1", transformers.iter().map(|t| t.bus1.clone()).collect::<Vec<_>>()),
        Series::new("s_nom_mva", transformers.iter().map(|t| t.s_nom_mva).collect::<Vec<_>>()),
        Series::new("r_pu", transformers.iter().map(|t| t.r_pu).collect::<Vec<_>>()),
        Series::new("x_pu", transformers.iter().map(|t| t.x_pu).collect::<Vec<_>>()),
        Series::new(
            "num_parallel",
            transformers.iter().map(|t| t.num_parallel).collect::<Vec<_>>(),
        ),
        Series::new(
            "std_type",
            transformers
                .iter()
                .map(|t| t.std_type.clone().unwrap_or_default())
                .collect::<Vec<_>>(),
        ),
    ])?;
    persist_dataframe(&mut transformers_df, &dir.join("transformers.parquet"))?;

    let mut loads = injection_frame(&tables.loads, &snapshots)?;
    persist_dataframe(&mut loads, &dir.join("loads.parquet"))?;
    let mut generators = injection_frame(&tables.generators, &snapshots)?;
    persist_dataframe(&mut generators, &dir.join("generators.parquet"))?;
    Ok(())
}

/// Long-format results: one row per component and snapshot.
pub fn results_to_dataframe(results: &PowerFlowResults) -> Result<DataFrame> {
    let mut components = Vec::new();
    let mut timestamps = Vec::new();
    let mut v_pu: Vec<Option<f64>> = Vec::new();
    let mut s_mva: Vec<Option<f64>> = Vec::new();
    let snapshots: Vec<i64> = results.snapshots().iter().map(|s| s.epoch_seconds()).collect();

    for (bus, values) in results.buses() {
        for (t, v) in values.iter().enumerate() {
            components.push(ComponentRef::Bus(*bus).to_string());
            timestamps.push(snapshots[t]);
            v_pu.push(Some(*v));
            s_mva.push(None);
        }
    }
    let branches = results
        .lines()
        .map(|(id, s)| (ComponentRef::Line(*id), s))
        .chain(
            results
                .transformers()
                .map(|(id, s)| (ComponentRef::Transformer(*id), s)),
        );
    for (component, series) in branches {
        for (t, s) in series.s.iter().enumerate() {
            components.push(component.to_string());
            timestamps.push(snapshots[t]);
            v_pu.push(None);
            s_mva.push(Some(*s));
        }
    }

    Ok(DataFrame::new(vec![
        Series::new("component", components),
        Series::new("timestamp", timestamps),
        Series::new("v_pu", v_pu),
        Series::new("s_mva", s_mva),
    ])?)
}

pub fn write_results(results: &PowerFlowResults, output: &Path) -> Result<()> {
    let mut df = results_to_dataframe(results)?;
    persist_dataframe(&mut df, output)
}

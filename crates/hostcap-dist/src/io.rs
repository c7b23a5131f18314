use std::path::Path;

use anyhow::Result;
use hostcap_algo::io::persist_dataframe;
use polars::prelude::{DataFrame, NamedFrom, Series};

use crate::report::ReinforcementReport;

/// One row per applied measure, oldest first.
pub fn reinforcements_to_dataframe(report: &ReinforcementReport) -> Result<DataFrame> {
    let rows = &report.applied;
    let df = DataFrame::new(vec![
        Series::new(
            "iteration",
            rows.iter().map(|r| r.iteration as u32).collect::<Vec<_>>(),
        ),
        Series::new(
            "component",
            rows.iter().map(|r| r.component.to_string()).collect::<Vec<_>>(),
        ),
        Series::new(
            "trigger",
            rows.iter().map(|r| r.trigger.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "timestamp",
            rows.iter().map(|r| r.snapshot.epoch_seconds()).collect::<Vec<_>>(),
        ),
        Series::new(
            "old_type",
            rows.iter().map(|r| r.before.std_type.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "new_type",
            rows.iter().map(|r| r.after.std_type.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "old_parallel",
            rows.iter().map(|r| r.before.num_parallel).collect::<Vec<_>>(),
        ),
        Series::new(
            "new_parallel",
            rows.iter().map(|r| r.after.num_parallel).collect::<Vec<_>>(),
        ),
        Series::new(
            "old_rating_mva",
            rows.iter().map(|r| r.before.rating_mva).collect::<Vec<_>>(),
        ),
        Series::new(
            "new_rating_mva",
            rows.iter().map(|r| r.after.rating_mva).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}

/// Write the audit trail of `report` to `path` (Snappy-compressed Parquet).
pub fn write_reinforcements(report: &ReinforcementReport, path: &Path) -> Result<()> {
    let mut df = reinforcements_to_dataframe(report)?;
    persist_dataframe(&mut df, path)
}

use hostcap_core::{GridError, Snapshot};
use thiserror::Error;

/// Failures of a power-flow run.
#[derive(Error, Debug)]
pub enum PowerFlowError {
    /// The solver did not converge for these snapshots. No partial result
    /// is returned.
    #[error("power flow did not converge for {} snapshot(s): {}", snapshots.len(), format_snapshots(snapshots))]
    NonConvergence { snapshots: Vec<Snapshot> },

    /// The network shape is outside what the solver can handle.
    #[error("unsupported topology: {0}")]
    UnsupportedTopology(String),

    /// Solver output does not cover every table row and snapshot.
    #[error("incomplete power flow results: {0}")]
    IncompleteResults(String),

    #[error(transparent)]
    Grid(#[from] GridError),
}

fn format_snapshots(snapshots: &[Snapshot]) -> String {
    snapshots
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

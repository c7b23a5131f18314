use hostcap_algo::PowerFlowError;
use hostcap_core::GridError;
use thiserror::Error;

use crate::report::ReinforcementReport;

#[derive(Error, Debug)]
pub enum ReinforceError {
    /// Translation or topology failure; nothing was solved.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// The solver failed during a resolve. Reinforcements of completed
    /// passes stay applied.
    #[error(transparent)]
    PowerFlow(#[from] PowerFlowError),

    /// No convergence within the iteration cap, or no applicable measure
    /// left. The report carries the remaining violations.
    #[error(
        "reinforcement stalled after {} iteration(s) with {} remaining violation(s)",
        .0.iterations,
        .0.remaining_violations.len()
    )]
    Stalled(Box<ReinforcementReport>),
}

impl ReinforceError {
    /// The report of a stalled run.
    pub fn report(&self) -> Option<&ReinforcementReport> {
        match self {
            ReinforceError::Stalled(report) => Some(report),
            _ => None,
        }
    }
}

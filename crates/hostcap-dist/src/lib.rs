//! # hostcap-dist: Grid Reinforcement
//!
//! Drives the analyze/reinforce/resolve loop over a [`Topology`] until every
//! bus voltage and branch loading is within its technical limit, or until
//! the run stalls.
//!
//! - [`ReinforcementEngine`]: the state machine; owns the topology for the
//!   duration of [`ReinforcementEngine::run`]
//! - [`measures`]: catalog-based upgrades and parallel circuits for one pass
//! - [`ReinforcementReport`]: audit trail of applied measures and the
//!   terminal state
//! - [`ReinforcementConfig`]: limits, mode and solver settings, loadable
//!   from YAML, JSON or TOML
//!
//! ```ignore
//! let engine = ReinforcementEngine::new(&catalog, ReinforcementConfig::default());
//! match engine.run(&mut topology, &series) {
//!     Ok(report) => println!("{} measures", report.applied.len()),
//!     Err(ReinforceError::Stalled(report)) => eprintln!("{:?}", report.remaining_violations),
//!     Err(err) => return Err(err.into()),
//! }
//! ```
//!
//! [`Topology`]: hostcap_core::Topology

pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod measures;
pub mod report;

pub use config::{load_config_from_path, ReinforcementConfig};
pub use engine::{Analysis, ReinforcementEngine};
pub use error::ReinforceError;
pub use io::{reinforcements_to_dataframe, write_reinforcements};
pub use measures::{MeasurePlanner, PassOutcome};
pub use report::{
    EngineState, EquipmentState, MeasureFailure, PassSummary, ReinforcementRecord,
    ReinforcementReport,
};

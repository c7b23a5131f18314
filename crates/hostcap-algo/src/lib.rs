//! # hostcap-algo: Translation, Power Flow and Limit Analysis
//!
//! This crate sits between the topology model and the reinforcement engine:
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Translate | [`translator`] | [`SolverTables`]: flat rows keyed by stable table keys |
//! | Solve | [`power_flow`] | [`PowerFlowOutput`]: per-key voltages and branch flows |
//! | Map back | [`results`] | [`PowerFlowResults`]: per-component, per-snapshot values |
//! | Analyze | [`violations`] | [`ViolationRecord`]s ordered for reinforcement |
//!
//! The solver is a seam: anything implementing [`PowerFlowSolver`] can be
//! plugged in. [`RadialSweepSolver`] is the built-in reference for radial
//! distribution feeders.
//!
//! ## Example
//!
//! ```ignore
//! use hostcap_algo::{AnalysisMode, PowerFlowSolver, RadialSweepSolver, Translator};
//!
//! let translator = Translator::new(&catalog);
//! translator.resolve_missing_parameters(&mut topology)?;
//! let tables = translator.to_tables(&topology, &series, AnalysisMode::MvOnly, &SnapshotRange::all())?;
//! let output = RadialSweepSolver::default().solve(&tables)?;
//! let results = PowerFlowResults::from_output(&tables, &output)?;
//! let violations = analyze_violations(&topology, &results, &LimitConfig::default());
//! ```

pub mod error;
pub mod io;
pub mod mode;
pub mod power_flow;
pub mod results;
pub mod tables;
pub mod translator;
pub mod violations;

pub use error::PowerFlowError;
pub use mode::AnalysisMode;
pub use power_flow::{
    BranchFlow, PowerFlowOutput, PowerFlowSolver, RadialSweepSolver, SolverSettings,
};
pub use results::{BranchSeries, PowerFlowResults};
pub use tables::{BusRow, InjectionRow, KeyMap, LineRow, SolverTables, TransformerRow};
pub use translator::Translator;
pub use violations::{analyze_violations, LimitConfig, ViolationKind, ViolationRecord};

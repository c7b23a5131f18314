//! Reinforcement state machine.
//!
//! ```text
//!   validate topology, resolve parameters
//!          │
//!          ▼
//!      RESOLVE ──► ANALYZE ──(no violations)──► CONVERGED
//!         ▲           │
//!         │           ├──(iteration cap / nothing applicable)──► ABORTED
//!         │           ▼
//!         └──────  REINFORCE
//! ```
//!
//! Every pass sees the complete result set of all snapshots before any
//! measure is chosen. Measures of one pass are staged and committed
//! together.

use hostcap_algo::{
    analyze_violations, PowerFlowResults, PowerFlowSolver, RadialSweepSolver, Translator,
    ViolationRecord,
};
use hostcap_core::{EquipmentCatalog, GridError, Topology};
use hostcap_ts::TimeSeries;
use tracing::{debug, info, warn};

use crate::config::ReinforcementConfig;
use crate::error::ReinforceError;
use crate::measures::MeasurePlanner;
use crate::report::{EngineState, PassSummary, ReinforcementReport};

/// Limit-violation analysis of one solve.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub results: PowerFlowResults,
    pub violations: Vec<ViolationRecord>,
}

pub struct ReinforcementEngine<'a> {
    catalog: &'a EquipmentCatalog,
    config: ReinforcementConfig,
    solver: Box<dyn PowerFlowSolver + 'a>,
}

impl<'a> ReinforcementEngine<'a> {
    /// Engine backed by the radial sweep solver configured in `config`.
    pub fn new(catalog: &'a EquipmentCatalog, config: ReinforcementConfig) -> Self {
        let solver = RadialSweepSolver::new(config.solver);
        Self {
            catalog,
            config,
            solver: Box::new(solver),
        }
    }

    pub fn with_solver(mut self, solver: impl PowerFlowSolver + 'a) -> Self {
        self.solver = Box::new(solver);
        self
    }

    pub fn config(&self) -> &ReinforcementConfig {
        &self.config
    }

    fn translator(&self) -> Translator<'a> {
        Translator::new(self.catalog).with_frequency(self.config.system_frequency_hz)
    }

    /// Translate, solve and check limits without touching the topology.
    ///
    /// The topology must already be complete; see
    /// [`Translator::resolve_missing_parameters`].
    pub fn analyze(
        &self,
        topology: &Topology,
        series: &TimeSeries,
    ) -> Result<Analysis, ReinforceError> {
        let tables = self.translator().to_tables(
            topology,
            series,
            self.config.mode,
            &self.config.snapshots,
        )?;
        let output = self.solver.solve(&tables)?;
        let results = PowerFlowResults::from_output(&tables, &output)?;
        let violations = analyze_violations(topology, &results, &self.config.limits);
        Ok(Analysis {
            results,
            violations,
        })
    }

    /// Reinforce `topology` in place until no limit is violated.
    ///
    /// The topology is validated first: warnings are logged, errors abort
    /// the run before any parameter is touched. Missing parameters are then
    /// defaulted from the catalog. Passes that
    /// completed before a solver failure stay applied; a stalled run keeps
    /// every applied pass as well and returns [`ReinforceError::Stalled`].
    pub fn run(
        &self,
        topology: &mut Topology,
        series: &TimeSeries,
    ) -> Result<ReinforcementReport, ReinforceError> {
        preflight(topology)?;
        let defaulted = self.translator().resolve_missing_parameters(topology)?;
        let mut report = ReinforcementReport::new(defaulted);
        let planner = MeasurePlanner::new(
            self.catalog,
            self.config.system_frequency_hz,
            self.config.limits,
        );
        info!(
            topology = topology.name(),
            mode = %self.config.mode,
            snapshots = series.len(),
            max_iterations = self.config.max_iterations,
            "starting reinforcement"
        );

        loop {
            transition(&mut report, EngineState::Analyze);
            let analysis = self.analyze(topology, series)?;
            report
                .history
                .push(PassSummary::from_violations(report.iterations, &analysis.violations));
            if analysis.violations.is_empty() {
                transition(&mut report, EngineState::Converged);
                report.remaining_violations.clear();
                info!(
                    iterations = report.iterations,
                    measures = report.applied.len(),
                    "reinforcement converged"
                );
                return Ok(report);
            }
            info!(
                iteration = report.iterations,
                violations = analysis.violations.len(),
                "limit violations found"
            );

            if report.iterations >= self.config.max_iterations {
                warn!(
                    max_iterations = self.config.max_iterations,
                    remaining = analysis.violations.len(),
                    "iteration cap reached without convergence"
                );
                return Err(abort(report, analysis.violations));
            }

            transition(&mut report, EngineState::Reinforce);
            let iteration = report.iterations + 1;
            let outcome = planner.apply_pass(
                topology,
                &analysis.results,
                &analysis.violations,
                iteration,
            )?;
            report.failures.extend(outcome.failures);
            if outcome.applied.is_empty() {
                warn!(
                    iteration,
                    remaining = analysis.violations.len(),
                    "no applicable reinforcement left"
                );
                return Err(abort(report, analysis.violations));
            }
            info!(iteration, measures = outcome.applied.len(), "reinforcement pass applied");
            *topology = outcome.staged;
            report.applied.extend(outcome.applied);
            report.iterations = iteration;

            transition(&mut report, EngineState::Resolve);
        }
    }
}

/// Structural checks before a run; warnings are logged, errors are fatal.
fn preflight(topology: &Topology) -> Result<(), ReinforceError> {
    let diagnostics = topology.validate();
    for issue in diagnostics.warnings() {
        warn!(%issue, "topology check");
    }
    if diagnostics.has_errors() {
        let errors: Vec<String> = diagnostics.errors().map(|issue| issue.to_string()).collect();
        return Err(GridError::Validation(format!(
            "topology failed validation ({}): {}",
            diagnostics.summary(),
            errors.join("; ")
        ))
        .into());
    }
    Ok(())
}

fn transition(report: &mut ReinforcementReport, next: EngineState) {
    debug!(from = %report.state, to = %next, "engine state");
    report.state = next;
}

fn abort(mut report: ReinforcementReport, violations: Vec<ViolationRecord>) -> ReinforceError {
    transition(&mut report, EngineState::Aborted);
    report.remaining_violations = violations;
    ReinforceError::Stalled(Box::new(report))
}

use std::collections::HashSet;

use hostcap_algo::{ViolationKind, ViolationRecord};
use hostcap_core::{ComponentRef, Snapshot};
use serde::Serialize;

/// States of the reinforcement loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Analyze,
    Reinforce,
    Resolve,
    Converged,
    Aborted,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Analyze => "analyze",
            EngineState::Reinforce => "reinforce",
            EngineState::Resolve => "resolve",
            EngineState::Converged => "converged",
            EngineState::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equipment state of a line or transformer before/after a measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipmentState {
    pub std_type: Option<String>,
    pub num_parallel: u32,
    /// Combined rating in MVA
    pub rating_mva: f64,
}

/// Audit entry for one applied measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReinforcementRecord {
    /// Reinforcement pass, starting at 1
    pub iteration: usize,
    pub component: ComponentRef,
    pub trigger: ViolationKind,
    /// Worst snapshot of the triggering violation
    pub snapshot: Snapshot,
    pub before: EquipmentState,
    pub after: EquipmentState,
}

/// A measure that could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureFailure {
    pub iteration: usize,
    pub component: ComponentRef,
    pub reason: String,
}

/// Violation counts of one analysis, kept for every pass of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassSummary {
    /// Reinforcement passes applied before this analysis
    pub iteration: usize,
    pub violations: usize,
    pub voltage_violations: usize,
    pub overloads: usize,
    /// Distinct components in violation
    pub components: usize,
}

impl PassSummary {
    pub(crate) fn from_violations(iteration: usize, violations: &[ViolationRecord]) -> Self {
        let voltage_violations = violations.iter().filter(|v| v.kind.is_voltage()).count();
        let components: HashSet<ComponentRef> = violations.iter().map(|v| v.component).collect();
        Self {
            iteration,
            violations: violations.len(),
            voltage_violations,
            overloads: violations.len() - voltage_violations,
            components: components.len(),
        }
    }
}

/// Outcome of a reinforcement run.
#[derive(Debug, Clone, Serialize)]
pub struct ReinforcementReport {
    pub state: EngineState,
    /// Number of reinforcement passes applied
    pub iterations: usize,
    pub applied: Vec<ReinforcementRecord>,
    pub failures: Vec<MeasureFailure>,
    /// Components whose missing parameters were filled from the catalog
    pub defaulted: Vec<ComponentRef>,
    /// One entry per analysis, oldest first
    pub history: Vec<PassSummary>,
    /// Violations of the last analysis; empty when converged
    pub remaining_violations: Vec<ViolationRecord>,
}

impl ReinforcementReport {
    pub(crate) fn new(defaulted: Vec<ComponentRef>) -> Self {
        Self {
            state: EngineState::Analyze,
            iterations: 0,
            applied: Vec::new(),
            failures: Vec::new(),
            defaulted,
            history: Vec::new(),
            remaining_violations: Vec::new(),
        }
    }

    pub fn converged(&self) -> bool {
        self.state == EngineState::Converged
    }

    /// Applied measures of one component, oldest first.
    pub fn measures_for(&self, component: ComponentRef) -> impl Iterator<Item = &ReinforcementRecord> {
        self.applied.iter().filter(move |r| r.component == component)
    }
}

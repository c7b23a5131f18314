//! Flat, solver-facing tables.
//!
//! Every row carries a table-unique string key. The [`KeyMap`] ties those
//! keys back to topology components so solver output can be mapped to
//! results without ambiguity.

use std::collections::{BTreeMap, BTreeSet};

use hostcap_core::{ComponentRef, GridError, GridResult, Snapshot, VoltageLevel};
use serde::Serialize;

use crate::mode::AnalysisMode;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusRow {
    pub key: String,
    pub v_nom_kv: f64,
    pub level: VoltageLevel,
    /// Voltage-controlled reference bus (1.0 p.u., angle 0)
    pub is_slack: bool,
}

/// A line row with all parallel circuits folded into one branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRow {
    pub key: String,
    pub bus0: String,
    pub bus1: String,
    pub length_km: f64,
    /// Effective resistance of all circuits in ohm
    pub r_ohm: f64,
    /// Effective reactance of all circuits in ohm
    pub x_ohm: f64,
    /// Combined thermal rating in MVA
    pub s_nom_mva: f64,
    pub num_parallel: u32,
    pub std_type: Option<String>,
}

impl LineRow {
    /// Per-circuit resistance, recovered from the effective value.
    pub fn r_ohm_per_circuit(&self) -> f64 {
        self.r_ohm * self.num_parallel as f64
    }

    pub fn x_ohm_per_circuit(&self) -> f64 {
        self.x_ohm * self.num_parallel as f64
    }

    pub fn s_nom_per_circuit(&self) -> f64 {
        self.s_nom_mva / self.num_parallel as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformerRow {
    pub key: String,
    /// MV side
    pub bus0: String,
    /// LV side
    pub bus1: String,
    /// Combined rating of all parallel units in MVA
    pub s_nom_mva: f64,
    /// Resistance in p.u. of the combined rating
    pub r_pu: f64,
    /// Reactance in p.u. of the combined rating
    pub x_pu: f64,
    pub num_parallel: u32,
    pub std_type: Option<String>,
}

/// A load or generator with its per-snapshot set points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjectionRow {
    pub key: String,
    pub bus: String,
    /// Peak load (loads) or nominal capacity (generators) in MW
    pub nominal_mw: f64,
    /// Active power per snapshot in MW; positive is consumption for loads
    /// and production for generators
    pub p_set: Vec<f64>,
    pub q_set: Vec<f64>,
}

/// Bidirectional mapping between table keys and topology components.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    by_key: BTreeMap<String, ComponentRef>,
    by_component: BTreeMap<ComponentRef, String>,
}

impl KeyMap {
    pub fn insert(&mut self, key: String, component: ComponentRef) -> GridResult<()> {
        if self.by_key.contains_key(&key) {
            return Err(GridError::Validation(format!("duplicate table key '{key}'")));
        }
        if self.by_component.contains_key(&component) {
            return Err(GridError::Validation(format!(
                "{component} emitted twice"
            )));
        }
        self.by_key.insert(key.clone(), component);
        self.by_component.insert(component, key);
        Ok(())
    }

    pub fn component(&self, key: &str) -> Option<ComponentRef> {
        self.by_key.get(key).copied()
    }

    pub fn key(&self, component: ComponentRef) -> Option<&str> {
        self.by_component.get(&component).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ComponentRef)> {
        self.by_key.iter().map(|(k, c)| (k.as_str(), *c))
    }
}

/// Everything a solver needs for one run over a snapshot set.
#[derive(Debug, Clone)]
pub struct SolverTables {
    pub mode: AnalysisMode,
    pub snapshots: Vec<Snapshot>,
    pub buses: Vec<BusRow>,
    pub lines: Vec<LineRow>,
    pub transformers: Vec<TransformerRow>,
    pub loads: Vec<InjectionRow>,
    pub generators: Vec<InjectionRow>,
    pub keys: KeyMap,
}

impl SolverTables {
    pub fn new(mode: AnalysisMode, snapshots: Vec<Snapshot>) -> Self {
        Self {
            mode,
            snapshots,
            buses: Vec::new(),
            lines: Vec::new(),
            transformers: Vec::new(),
            loads: Vec::new(),
            generators: Vec::new(),
            keys: KeyMap::default(),
        }
    }

    pub fn slack_buses(&self) -> impl Iterator<Item = &BusRow> {
        self.buses.iter().filter(|b| b.is_slack)
    }

    /// Precondition check before handing the tables to a solver: every
    /// reference resolves, every required field is set and finite, every
    /// series covers every snapshot.
    pub fn validate(&self) -> GridResult<()> {
        if self.snapshots.is_empty() {
            return Err(GridError::Validation("no snapshots to solve".to_string()));
        }
        if self.slack_buses().next().is_none() {
            return Err(GridError::Validation("tables contain no slack bus".to_string()));
        }

        let mut bus_keys = BTreeSet::new();
        for bus in &self.buses {
            if !bus_keys.insert(bus.key.as_str()) {
                return Err(GridError::Validation(format!("duplicate bus key '{}'", bus.key)));
            }
            if !(bus.v_nom_kv.is_finite() && bus.v_nom_kv > 0.0) {
                return Err(GridError::incomplete(&bus.key, "nominal voltage unset"));
            }
        }

        let has_bus = |key: &str, owner: &str| -> GridResult<()> {
            if bus_keys.contains(key) {
                Ok(())
            } else {
                Err(GridError::incomplete(owner, format!("bus '{key}' not in tables")))
            }
        };

        for line in &self.lines {
            has_bus(&line.bus0, &line.key)?;
            has_bus(&line.bus1, &line.key)?;
            let fields = [line.r_ohm, line.x_ohm];
            if fields.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(GridError::incomplete(&line.key, "impedance unset or negative"));
            }
            if !(line.s_nom_mva.is_finite() && line.s_nom_mva > 0.0) {
                return Err(GridError::incomplete(&line.key, "thermal rating unset"));
            }
            if line.num_parallel == 0 {
                return Err(GridError::incomplete(&line.key, "no circuits"));
            }
        }

        for transformer in &self.transformers {
            has_bus(&transformer.bus0, &transformer.key)?;
            has_bus(&transformer.bus1, &transformer.key)?;
            if !(transformer.s_nom_mva.is_finite() && transformer.s_nom_mva > 0.0) {
                return Err(GridError::incomplete(&transformer.key, "rated power unset"));
            }
            if [transformer.r_pu, transformer.x_pu]
                .iter()
                .any(|v| !v.is_finite() || *v < 0.0)
            {
                return Err(GridError::incomplete(&transformer.key, "impedance unset or negative"));
            }
        }

        for row in self.loads.iter().chain(self.generators.iter()) {
            has_bus(&row.bus, &row.key)?;
            if row.p_set.len() != self.snapshots.len() || row.q_set.len() != self.snapshots.len() {
                return Err(GridError::Validation(format!(
                    "'{}' has {} values for {} snapshots",
                    row.key,
                    row.p_set.len(),
                    self.snapshots.len()
                )));
            }
            if row.p_set.iter().chain(row.q_set.iter()).any(|v| !v.is_finite()) {
                return Err(GridError::Validation(format!("'{}' has non-finite set points", row.key)));
            }
        }

        let rows = self.buses.len()
            + self.lines.len()
            + self.transformers.len()
            + self.loads.len()
            + self.generators.len();
        if rows != self.keys.len() {
            return Err(GridError::Validation(format!(
                "{} rows but {} mapped keys",
                rows,
                self.keys.len()
            )));
        }
        Ok(())
    }
}

//! Results store: solver output mapped back onto topology components.

use std::collections::BTreeMap;

use hostcap_core::{BusId, ComponentRef, LineId, Snapshot, TransformerId};
use serde::Serialize;

use crate::error::PowerFlowError;
use crate::power_flow::PowerFlowOutput;
use crate::tables::SolverTables;

/// Branch values over all snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BranchSeries {
    pub p0: Vec<f64>,
    pub q0: Vec<f64>,
    /// Apparent power in MVA
    pub s: Vec<f64>,
}

impl BranchSeries {
    /// Largest apparent power and the snapshot index where it occurs.
    pub fn peak(&self) -> Option<(usize, f64)> {
        self.s
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Per-component, per-snapshot power-flow results of one run.
///
/// Always complete: construction fails unless every bus and branch of the
/// tables has a value for every snapshot.
#[derive(Debug, Clone, Default)]
pub struct PowerFlowResults {
    snapshots: Vec<Snapshot>,
    bus_v_pu: BTreeMap<BusId, Vec<f64>>,
    lines: BTreeMap<LineId, BranchSeries>,
    transformers: BTreeMap<TransformerId, BranchSeries>,
}

impl PowerFlowResults {
    /// Map solver output back through the table keys.
    ///
    /// Unknown keys, keys of the wrong component kind, missing rows and
    /// short series are all [`PowerFlowError::IncompleteResults`].
    pub fn from_output(
        tables: &SolverTables,
        output: &PowerFlowOutput,
    ) -> Result<Self, PowerFlowError> {
        if output.snapshots != tables.snapshots {
            return Err(PowerFlowError::IncompleteResults(format!(
                "output covers {} snapshots, tables request {}",
                output.snapshots.len(),
                tables.snapshots.len()
            )));
        }
        let n = tables.snapshots.len();
        let check_len = |key: &str, len: usize| {
            if len == n {
                Ok(())
            } else {
                Err(PowerFlowError::IncompleteResults(format!(
                    "'{key}' has {len} values for {n} snapshots"
                )))
            }
        };

        let mut results = PowerFlowResults {
            snapshots: tables.snapshots.clone(),
            ..Default::default()
        };

        for (key, values) in &output.bus_v_pu {
            check_len(key, values.len())?;
            match tables.keys.component(key) {
                Some(ComponentRef::Bus(id)) => {
                    results.bus_v_pu.insert(id, values.clone());
                }
                _ => {
                    return Err(PowerFlowError::IncompleteResults(format!(
                        "voltage for unknown bus key '{key}'"
                    )))
                }
            }
        }

        for (key, flow) in &output.branch_flows {
            check_len(key, flow.s.len())?;
            check_len(key, flow.p0.len())?;
            check_len(key, flow.q0.len())?;
            let series = BranchSeries {
                p0: flow.p0.clone(),
                q0: flow.q0.clone(),
                s: flow.s.clone(),
            };
            match tables.keys.component(key) {
                Some(ComponentRef::Line(id)) => {
                    results.lines.insert(id, series);
                }
                Some(ComponentRef::Transformer(id)) => {
                    results.transformers.insert(id, series);
                }
                _ => {
                    return Err(PowerFlowError::IncompleteResults(format!(
                        "flow for unknown branch key '{key}'"
                    )))
                }
            }
        }

        if let Some(bus) = tables
            .buses
            .iter()
            .find(|b| !output.bus_v_pu.contains_key(&b.key))
        {
            return Err(PowerFlowError::IncompleteResults(format!(
                "no voltage for '{}'",
                bus.key
            )));
        }
        if let Some(key) = tables
            .lines
            .iter()
            .map(|l| &l.key)
            .chain(tables.transformers.iter().map(|t| &t.key))
            .find(|k| !output.branch_flows.contains_key(k.as_str()))
        {
            return Err(PowerFlowError::IncompleteResults(format!("no flow for '{key}'")));
        }

        Ok(results)
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Voltage magnitudes of a bus in p.u.
    pub fn v_res(&self, bus: BusId) -> Option<&[f64]> {
        self.bus_v_pu.get(&bus).map(Vec::as_slice)
    }

    /// Apparent power through a line or transformer in MVA.
    pub fn s_res(&self, component: ComponentRef) -> Option<&[f64]> {
        match component {
            ComponentRef::Line(id) => self.lines.get(&id).map(|s| s.s.as_slice()),
            ComponentRef::Transformer(id) => self.transformers.get(&id).map(|s| s.s.as_slice()),
            _ => None,
        }
    }

    pub fn line(&self, id: LineId) -> Option<&BranchSeries> {
        self.lines.get(&id)
    }

    pub fn transformer(&self, id: TransformerId) -> Option<&BranchSeries> {
        self.transformers.get(&id)
    }

    pub fn buses(&self) -> impl Iterator<Item = (&BusId, &Vec<f64>)> {
        self.bus_v_pu.iter()
    }

    pub fn lines(&self) -> impl Iterator<Item = (&LineId, &BranchSeries)> {
        self.lines.iter()
    }

    pub fn transformers(&self) -> impl Iterator<Item = (&TransformerId, &BranchSeries)> {
        self.transformers.iter()
    }

    /// Number of component rows (buses + branches).
    pub fn len(&self) -> usize {
        self.bus_v_pu.len() + self.lines.len() + self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

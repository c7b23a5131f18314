//! # Power-Flow Invoker
//!
//! The reinforcement loop only needs a function "tables + snapshots in,
//! voltages and branch flows out". [`PowerFlowSolver`] is that seam; any
//! external solver can be wrapped behind it.
//!
//! ## Reference solver: backward/forward sweep
//!
//! Distribution feeders are operated radially, which allows the classic
//! ladder-network iteration instead of a full Newton-Raphson solve:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  BACKWARD/FORWARD SWEEP (per snapshot, per unit on base_mva)         │
//! │                                                                      │
//! │  init   V_n = 1∠0 for every bus                                      │
//! │  repeat                                                              │
//! │    1. node currents      I_n = conj(S_n / V_n)                       │
//! │    2. backward sweep     I_b = I_child + Σ I_(branches below child)  │
//! │                          (leaves → slack)                            │
//! │    3. forward sweep      V_child = V_parent − Z_b · I_b              │
//! │                          (slack → leaves)                            │
//! │  until max |ΔV| < tolerance                                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line impedances are converted with the base impedance of their nominal
//! voltage (U²/S_base); transformer impedances are rescaled from their own
//! rating to the system base. Transformers are modelled with nominal ratio,
//! so per-unit voltages carry straight through the station.
//!
//! Each island must be a tree containing exactly one slack bus. Meshed or
//! unfed networks are rejected with [`PowerFlowError::UnsupportedTopology`]
//! before any iteration. Snapshots are independent and solved in parallel
//! with rayon; if any of them fails to converge the whole call fails with
//! [`PowerFlowError::NonConvergence`] listing all failing snapshots.
//!
//! ## References
//!
//! - **Kersting (2012)**: "Distribution System Modeling and Analysis", 3rd ed.,
//!   CRC Press, ch. 10 (ladder iterative technique).
//! - **Shirmohammadi et al. (1988)**: "A compensation-based power flow method for
//!   weakly meshed distribution and transmission networks", IEEE Trans. Power
//!   Systems 3(2), 753-762. DOI: [10.1109/59.192932](https://doi.org/10.1109/59.192932)

use std::collections::{BTreeMap, HashMap, VecDeque};

use hostcap_core::{Kilovolts, Snapshot};
use num_complex::Complex64;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PowerFlowError;
use crate::tables::SolverTables;

/// Flow through one branch, one value per snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BranchFlow {
    /// Active power entering the branch at `bus0` in MW
    pub p0: Vec<f64>,
    /// Reactive power entering the branch at `bus0` in Mvar
    pub q0: Vec<f64>,
    /// Apparent power, larger of both ends, in MVA
    pub s: Vec<f64>,
}

/// Raw solver output keyed by table keys.
#[derive(Debug, Clone, Default)]
pub struct PowerFlowOutput {
    pub snapshots: Vec<Snapshot>,
    pub bus_v_pu: BTreeMap<String, Vec<f64>>,
    pub branch_flows: BTreeMap<String, BranchFlow>,
}

pub trait PowerFlowSolver: Send + Sync {
    /// Solve every snapshot of `tables`. Either all snapshots are returned
    /// or the call fails.
    fn solve(&self, tables: &SolverTables) -> Result<PowerFlowOutput, PowerFlowError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Convergence threshold on the largest voltage update in p.u.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// System base power in MVA
    pub base_mva: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 100,
            base_mva: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RadialSweepSolver {
    pub settings: SolverSettings,
}

impl RadialSweepSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }
}

struct Branch {
    key: String,
    bus0: usize,
    bus1: usize,
    z_pu: Complex64,
}

/// Rooted spanning structure shared by all snapshots.
struct Feeder {
    num_buses: usize,
    /// Buses in breadth-first order from their slack
    order: Vec<usize>,
    /// Branch feeding each bus (None for slack buses)
    parent_branch: Vec<Option<usize>>,
    parent_bus: Vec<usize>,
}

struct SnapshotSolution {
    v: Vec<Complex64>,
    branch_current: Vec<Complex64>,
}

impl RadialSweepSolver {
    fn build_branches(
        &self,
        tables: &SolverTables,
        index: &HashMap<&str, usize>,
    ) -> Result<Vec<Branch>, PowerFlowError> {
        let base = self.settings.base_mva;
        let lookup = |bus: &str, owner: &str| {
            index.get(bus).copied().ok_or_else(|| {
                PowerFlowError::UnsupportedTopology(format!("{owner} references unknown bus '{bus}'"))
            })
        };
        let mut branches = Vec::with_capacity(tables.lines.len() + tables.transformers.len());
        for line in &tables.lines {
            let bus0 = lookup(&line.bus0, &line.key)?;
            let z_base = Kilovolts(tables.buses[bus0].v_nom_kv).base_impedance_ohm(base);
            branches.push(Branch {
                key: line.key.clone(),
                bus0,
                bus1: lookup(&line.bus1, &line.key)?,
                z_pu: Complex64::new(line.r_ohm, line.x_ohm) / z_base,
            });
        }
        for transformer in &tables.transformers {
            branches.push(Branch {
                key: transformer.key.clone(),
                bus0: lookup(&transformer.bus0, &transformer.key)?,
                bus1: lookup(&transformer.bus1, &transformer.key)?,
                z_pu: Complex64::new(transformer.r_pu, transformer.x_pu) * base
                    / transformer.s_nom_mva,
            });
        }
        Ok(branches)
    }

    fn build_feeder(
        &self,
        tables: &SolverTables,
        branches: &[Branch],
    ) -> Result<Feeder, PowerFlowError> {
        let n = tables.buses.len();
        let mut graph: UnGraph<usize, usize> = UnGraph::with_capacity(n, branches.len());
        let nodes: Vec<NodeIndex> = (0..n).map(|i| graph.add_node(i)).collect();
        for (b, branch) in branches.iter().enumerate() {
            graph.add_edge(nodes[branch.bus0], nodes[branch.bus1], b);
        }

        let components = petgraph::algo::connected_components(&graph);
        if graph.edge_count() + components != graph.node_count() {
            return Err(PowerFlowError::UnsupportedTopology(
                "network is meshed; the sweep solver needs a radial network".to_string(),
            ));
        }

        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut parent_branch = vec![None; n];
        let mut parent_bus = (0..n).collect::<Vec<_>>();
        for (root, bus) in tables.buses.iter().enumerate() {
            if !bus.is_slack {
                continue;
            }
            if visited[root] {
                return Err(PowerFlowError::UnsupportedTopology(format!(
                    "slack bus '{}' shares an island with another slack bus",
                    bus.key
                )));
            }
            visited[root] = true;
            let mut queue = VecDeque::from([root]);
            while let Some(current) = queue.pop_front() {
                order.push(current);
                for edge in graph.edges(nodes[current]) {
                    let other = if edge.source() == nodes[current] {
                        graph[edge.target()]
                    } else {
                        graph[edge.source()]
                    };
                    if visited[other] {
                        continue;
                    }
                    visited[other] = true;
                    parent_branch[other] = Some(*edge.weight());
                    parent_bus[other] = current;
                    queue.push_back(other);
                }
            }
        }

        if let Some(unfed) = visited.iter().position(|v| !v) {
            return Err(PowerFlowError::UnsupportedTopology(format!(
                "bus '{}' is not connected to any slack bus",
                tables.buses[unfed].key
            )));
        }

        Ok(Feeder {
            num_buses: n,
            order,
            parent_branch,
            parent_bus,
        })
    }

    fn solve_snapshot(
        &self,
        feeder: &Feeder,
        branches: &[Branch],
        demand: &[Complex64],
    ) -> Option<SnapshotSolution> {
        let n = feeder.num_buses;
        let mut v = vec![Complex64::new(1.0, 0.0); n];
        let mut branch_current = vec![Complex64::new(0.0, 0.0); branches.len()];
        let mut accumulated = vec![Complex64::new(0.0, 0.0); n];

        for _ in 0..self.settings.max_iterations {
            for bus in 0..n {
                accumulated[bus] = if feeder.parent_branch[bus].is_some() {
                    (demand[bus] / v[bus]).conj()
                } else {
                    Complex64::new(0.0, 0.0)
                };
            }
            for &bus in feeder.order.iter().rev() {
                if let Some(b) = feeder.parent_branch[bus] {
                    branch_current[b] = accumulated[bus];
                    let parent = feeder.parent_bus[bus];
                    let carried = accumulated[bus];
                    accumulated[parent] += carried;
                }
            }

            let mut max_delta: f64 = 0.0;
            for &bus in &feeder.order {
                if let Some(b) = feeder.parent_branch[bus] {
                    let updated = v[feeder.parent_bus[bus]] - branches[b].z_pu * branch_current[b];
                    max_delta = max_delta.max((updated - v[bus]).norm());
                    v[bus] = updated;
                }
            }

            if !max_delta.is_finite() {
                return None;
            }
            if max_delta < self.settings.tolerance {
                return Some(SnapshotSolution { v, branch_current });
            }
        }
        None
    }
}

impl PowerFlowSolver for RadialSweepSolver {
    fn solve(&self, tables: &SolverTables) -> Result<PowerFlowOutput, PowerFlowError> {
        tables.validate()?;
        let base = self.settings.base_mva;
        let index: HashMap<&str, usize> = tables
            .buses
            .iter()
            .enumerate()
            .map(|(i, b)| (b.key.as_str(), i))
            .collect();
        let branches = self.build_branches(tables, &index)?;
        let feeder = self.build_feeder(tables, &branches)?;

        // Net demand per bus and snapshot in p.u. (consumption positive).
        let num_snapshots = tables.snapshots.len();
        let mut demand = vec![vec![Complex64::new(0.0, 0.0); tables.buses.len()]; num_snapshots];
        for (rows, sign) in [(&tables.loads, 1.0), (&tables.generators, -1.0)] {
            for row in rows.iter() {
                let bus = index.get(row.bus.as_str()).copied().ok_or_else(|| {
                    PowerFlowError::UnsupportedTopology(format!(
                        "{} references unknown bus '{}'",
                        row.key, row.bus
                    ))
                })?;
                for (t, per_bus) in demand.iter_mut().enumerate() {
                    per_bus[bus] += Complex64::new(row.p_set[t], row.q_set[t]) * sign / base;
                }
            }
        }

        let solutions: Vec<Option<SnapshotSolution>> = demand
            .par_iter()
            .map(|d| self.solve_snapshot(&feeder, &branches, d))
            .collect();

        let failed: Vec<Snapshot> = solutions
            .iter()
            .zip(&tables.snapshots)
            .filter(|(s, _)| s.is_none())
            .map(|(_, snapshot)| *snapshot)
            .collect();
        if !failed.is_empty() {
            return Err(PowerFlowError::NonConvergence { snapshots: failed });
        }

        let mut output = PowerFlowOutput {
            snapshots: tables.snapshots.clone(),
            ..Default::default()
        };
        for (i, bus) in tables.buses.iter().enumerate() {
            let values = solutions
                .iter()
                .flatten()
                .map(|s| s.v[i].norm())
                .collect();
            output.bus_v_pu.insert(bus.key.clone(), values);
        }
        for (b, branch) in branches.iter().enumerate() {
            let mut flow = BranchFlow::default();
            for solution in solutions.iter().flatten() {
                let current = solution.branch_current[b];
                // Current flows from the feeding end into the branch.
                let child = if feeder.parent_branch[branch.bus1] == Some(b) {
                    branch.bus1
                } else {
                    branch.bus0
                };
                let parent = feeder.parent_bus[child];
                let s_parent = solution.v[parent] * current.conj();
                let s_child = -(solution.v[child] * current.conj());
                let s0 = if parent == branch.bus0 { s_parent } else { s_child };
                flow.p0.push(s0.re * base);
                flow.q0.push(s0.im * base);
                flow.s.push(s_parent.norm().max(s_child.norm()) * base);
            }
            output.branch_flows.insert(branch.key.clone(), flow);
        }

        debug!(
            snapshots = num_snapshots,
            buses = tables.buses.len(),
            branches = branches.len(),
            "radial sweep converged"
        );
        Ok(output)
    }
}

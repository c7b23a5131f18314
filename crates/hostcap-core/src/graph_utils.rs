use std::collections::{HashMap, HashSet};

use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::{Bfs, EdgeRef};

use crate::topology::Topology;
use crate::{BusId, GridId, LineId, TransformerId};

/// Edge payload of the bus graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Line(LineId),
    Transformer(TransformerId),
}

/// Undirected petgraph view over the buses of a topology, built on demand.
#[derive(Debug)]
pub struct BusGraph {
    pub graph: UnGraph<BusId, Branch>,
    index: HashMap<BusId, NodeIndex>,
}

impl BusGraph {
    /// Every bus, line and transformer of the topology.
    pub fn build(topology: &Topology) -> Self {
        Self::build_filtered(topology, None)
    }

    /// Buses and lines of one grid only; transformers are left out.
    pub fn for_grid(topology: &Topology, grid: GridId) -> Self {
        Self::build_filtered(topology, Some(grid))
    }

    fn build_filtered(topology: &Topology, grid: Option<GridId>) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut index = HashMap::new();
        for bus in topology.buses() {
            if grid.map_or(true, |g| bus.grid == g) {
                index.insert(bus.id, graph.add_node(bus.id));
            }
        }
        for line in topology.lines() {
            if let (Some(&a), Some(&b)) = (index.get(&line.bus0()), index.get(&line.bus1())) {
                graph.add_edge(a, b, Branch::Line(line.id));
            }
        }
        if grid.is_none() {
            for transformer in topology.transformers() {
                if let (Some(&a), Some(&b)) =
                    (index.get(&transformer.bus0()), index.get(&transformer.bus1()))
                {
                    graph.add_edge(a, b, Branch::Transformer(transformer.id));
                }
            }
        }
        Self { graph, index }
    }

    pub fn node(&self, bus: BusId) -> Option<NodeIndex> {
        self.index.get(&bus).copied()
    }

    /// Buses reachable from `start` (breadth-first).
    pub fn reachable_from(&self, start: BusId) -> HashSet<BusId> {
        let mut seen = HashSet::new();
        if let Some(node) = self.node(start) {
            let mut bfs = Bfs::new(&self.graph, node);
            while let Some(nx) = bfs.next(&self.graph) {
                seen.insert(self.graph[nx]);
            }
        }
        seen
    }

    /// Branches on the shortest path between two buses, ordered from `from`.
    pub fn path(&self, from: BusId, to: BusId) -> Option<Vec<Branch>> {
        let start = self.node(from)?;
        let goal = self.node(to)?;
        let (_, nodes) = astar(&self.graph, start, |n| n == goal, |_| 1usize, |_| 0)?;
        let mut branches = Vec::with_capacity(nodes.len().saturating_sub(1));
        for pair in nodes.windows(2) {
            let edge = self
                .graph
                .edges(pair[0])
                .find(|e| e.target() == pair[1] || e.source() == pair[1])?;
            branches.push(*edge.weight());
        }
        Some(branches)
    }

    /// True when the graph has no cycles (edges = nodes - components).
    pub fn is_radial(&self) -> bool {
        let components = petgraph::algo::connected_components(&self.graph);
        self.graph.edge_count() + components == self.graph.node_count()
    }
}

/// Buses that cannot be reached from the slack bus through lines and transformers.
pub fn unreachable_buses(topology: &Topology) -> Vec<BusId> {
    let Some(slack) = topology.slack_bus() else {
        return topology.buses().map(|b| b.id).collect();
    };
    let reachable = BusGraph::build(topology).reachable_from(slack);
    topology
        .buses()
        .map(|b| b.id)
        .filter(|id| !reachable.contains(id))
        .collect()
}

/// Lines between the grid's feeding point and `bus`, in feeding order.
///
/// `None` when the bus is not connected to the feeding point inside its grid.
pub fn feeder_path(topology: &Topology, bus: BusId) -> Option<Vec<LineId>> {
    let grid = topology.bus(bus)?.grid;
    let feeding = topology.feeding_bus(grid)?;
    let graph = BusGraph::for_grid(topology, grid);
    let branches = graph.path(feeding, bus)?;
    Some(
        branches
            .into_iter()
            .filter_map(|b| match b {
                Branch::Line(id) => Some(id),
                Branch::Transformer(_) => None,
            })
            .collect(),
    )
}

//! Arena of grid components addressed by typed IDs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::{GridError, GridResult};
use crate::graph_utils;
use crate::{
    Bus, BusId, Generator, GeneratorId, Grid, GridId, Kilovolts, Line, LineId, Load, LoadId,
    Transformer, TransformerId, VoltageLevel,
};

/// The grid topology: one MV grid, its LV grids and all attached components.
///
/// Insertion goes through the `add_*` methods, which reject references to
/// unknown buses and voltage-level mismatches, so a `Topology` never holds a
/// dangling endpoint. Buses are immutable once added.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TopologyRecord", into = "TopologyRecord")]
pub struct Topology {
    name: String,
    grids: BTreeMap<GridId, Grid>,
    buses: BTreeMap<BusId, Bus>,
    lines: BTreeMap<LineId, Line>,
    transformers: BTreeMap<TransformerId, Transformer>,
    loads: BTreeMap<LoadId, Load>,
    generators: BTreeMap<GeneratorId, Generator>,
    slack_bus: Option<BusId>,
}

/// Summary counts for logging and CLI output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopologyStats {
    pub num_grids: usize,
    pub num_lv_grids: usize,
    pub num_buses: usize,
    pub num_lines: usize,
    pub num_transformers: usize,
    pub num_loads: usize,
    pub num_generators: usize,
}

impl Topology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grids: BTreeMap::new(),
            buses: BTreeMap::new(),
            lines: BTreeMap::new(),
            transformers: BTreeMap::new(),
            loads: BTreeMap::new(),
            generators: BTreeMap::new(),
            slack_bus: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_grid(&mut self, grid: Grid) -> GridResult<()> {
        if self.grids.contains_key(&grid.id) {
            return Err(GridError::Validation(format!("duplicate {}", grid.id)));
        }
        self.grids.insert(grid.id, grid);
        Ok(())
    }

    pub fn add_bus(&mut self, bus: Bus) -> GridResult<()> {
        if self.buses.contains_key(&bus.id) {
            return Err(GridError::Validation(format!("duplicate {}", bus.id)));
        }
        let grid = self
            .grids
            .get(&bus.grid)
            .ok_or_else(|| GridError::incomplete(bus.id, format!("{} does not exist", bus.grid)))?;
        if grid.level != bus.level {
            return Err(GridError::Validation(format!(
                "{} is {} but {} is {}",
                bus.id, bus.level, grid.id, grid.level
            )));
        }
        if !(bus.v_nom.value() > 0.0) {
            return Err(GridError::Validation(format!(
                "{} has non-positive nominal voltage",
                bus.id
            )));
        }
        self.buses.insert(bus.id, bus);
        Ok(())
    }

    fn require_bus(&self, component: impl ToString, bus: BusId) -> GridResult<&Bus> {
        self.buses
            .get(&bus)
            .ok_or_else(|| GridError::incomplete(component, format!("{bus} does not exist")))
    }

    pub fn add_line(&mut self, line: Line) -> GridResult<()> {
        if self.lines.contains_key(&line.id) {
            return Err(GridError::Validation(format!("duplicate {}", line.id)));
        }
        let bus0 = self.require_bus(line.id, line.bus0)?;
        let bus1 = self.require_bus(line.id, line.bus1)?;
        if line.bus0 == line.bus1 {
            return Err(GridError::Validation(format!(
                "{} connects {} to itself",
                line.id, line.bus0
            )));
        }
        if bus0.grid != bus1.grid {
            return Err(GridError::Validation(format!(
                "{} spans {} and {}; use a transformer between grids",
                line.id, bus0.grid, bus1.grid
            )));
        }
        if line.num_parallel() == 0 {
            return Err(GridError::Validation(format!(
                "{} has no parallel circuits",
                line.id
            )));
        }
        if !(line.length_km >= 0.0) {
            return Err(GridError::Validation(format!(
                "{} has negative length",
                line.id
            )));
        }
        self.lines.insert(line.id, line);
        Ok(())
    }

    pub fn add_transformer(&mut self, transformer: Transformer) -> GridResult<()> {
        if self.transformers.contains_key(&transformer.id) {
            return Err(GridError::Validation(format!("duplicate {}", transformer.id)));
        }
        let primary = self.require_bus(transformer.id, transformer.bus0)?;
        let secondary = self.require_bus(transformer.id, transformer.bus1)?;
        if primary.level != VoltageLevel::Mv || secondary.level != VoltageLevel::Lv {
            return Err(GridError::Validation(format!(
                "{} must connect an MV primary to an LV secondary",
                transformer.id
            )));
        }
        if transformer.num_parallel() == 0 {
            return Err(GridError::Validation(format!(
                "{} has no parallel units",
                transformer.id
            )));
        }
        self.transformers.insert(transformer.id, transformer);
        Ok(())
    }

    pub fn add_load(&mut self, load: Load) -> GridResult<()> {
        if self.loads.contains_key(&load.id) {
            return Err(GridError::Validation(format!("duplicate {}", load.id)));
        }
        self.require_bus(load.id, load.bus)?;
        self.loads.insert(load.id, load);
        Ok(())
    }

    pub fn add_generator(&mut self, generator: Generator) -> GridResult<()> {
        if self.generators.contains_key(&generator.id) {
            return Err(GridError::Validation(format!("duplicate {}", generator.id)));
        }
        self.require_bus(generator.id, generator.bus)?;
        self.generators.insert(generator.id, generator);
        Ok(())
    }

    /// Declare the MV feeding point (the HV/MV station busbar).
    pub fn set_slack_bus(&mut self, bus: BusId) -> GridResult<()> {
        let found = self.require_bus("slack", bus)?;
        if found.level != VoltageLevel::Mv {
            return Err(GridError::Validation(format!(
                "slack {bus} must be on the MV level"
            )));
        }
        self.slack_bus = Some(bus);
        Ok(())
    }

    pub fn slack_bus(&self) -> Option<BusId> {
        self.slack_bus
    }

    pub fn grid(&self, id: GridId) -> Option<&Grid> {
        self.grids.get(&id)
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses.get(&id)
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.get(&id)
    }

    pub fn transformer(&self, id: TransformerId) -> Option<&Transformer> {
        self.transformers.get(&id)
    }

    pub fn load(&self, id: LoadId) -> Option<&Load> {
        self.loads.get(&id)
    }

    pub fn generator(&self, id: GeneratorId) -> Option<&Generator> {
        self.generators.get(&id)
    }

    /// Mutable access for reinforcement. Endpoints stay fixed: they are only
    /// readable through [`Line::bus0`] and [`Line::bus1`].
    pub fn line_mut(&mut self, id: LineId) -> Option<&mut Line> {
        self.lines.get_mut(&id)
    }

    pub fn transformer_mut(&mut self, id: TransformerId) -> Option<&mut Transformer> {
        self.transformers.get_mut(&id)
    }

    pub fn grids(&self) -> impl Iterator<Item = &Grid> {
        self.grids.values()
    }

    pub fn buses(&self) -> impl Iterator<Item = &Bus> {
        self.buses.values()
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.values()
    }

    pub fn transformers(&self) -> impl Iterator<Item = &Transformer> {
        self.transformers.values()
    }

    pub fn loads(&self) -> impl Iterator<Item = &Load> {
        self.loads.values()
    }

    pub fn generators(&self) -> impl Iterator<Item = &Generator> {
        self.generators.values()
    }

    pub fn mv_grid(&self) -> Option<&Grid> {
        self.grids.values().find(|g| g.level == VoltageLevel::Mv)
    }

    pub fn lv_grids(&self) -> impl Iterator<Item = &Grid> {
        self.grids.values().filter(|g| g.level == VoltageLevel::Lv)
    }

    pub fn buses_in(&self, grid: GridId) -> impl Iterator<Item = &Bus> {
        self.buses.values().filter(move |b| b.grid == grid)
    }

    /// Grid a line belongs to (both endpoints share it).
    pub fn line_grid(&self, line: &Line) -> Option<GridId> {
        self.buses.get(&line.bus0).map(|b| b.grid)
    }

    /// The LV grid a transformer feeds.
    pub fn transformer_grid(&self, transformer: &Transformer) -> Option<GridId> {
        self.buses.get(&transformer.bus1).map(|b| b.grid)
    }

    /// Nominal voltages of a transformer's primary and secondary bus.
    pub fn transformer_voltages(&self, transformer: &Transformer) -> Option<(Kilovolts, Kilovolts)> {
        let primary = self.buses.get(&transformer.bus0)?.v_nom;
        let secondary = self.buses.get(&transformer.bus1)?.v_nom;
        Some((primary, secondary))
    }

    pub fn lines_in(&self, grid: GridId) -> impl Iterator<Item = &Line> {
        self.lines
            .values()
            .filter(move |l| self.line_grid(l) == Some(grid))
    }

    pub fn loads_in(&self, grid: GridId) -> impl Iterator<Item = &Load> {
        self.loads
            .values()
            .filter(move |l| self.buses.get(&l.bus).map(|b| b.grid) == Some(grid))
    }

    pub fn generators_in(&self, grid: GridId) -> impl Iterator<Item = &Generator> {
        self.generators
            .values()
            .filter(move |g| self.buses.get(&g.bus).map(|b| b.grid) == Some(grid))
    }

    /// MV/LV transformers whose secondary lies in `lv_grid`.
    pub fn station_transformers(&self, lv_grid: GridId) -> Vec<&Transformer> {
        self.transformers
            .values()
            .filter(|t| self.transformer_grid(t) == Some(lv_grid))
            .collect()
    }

    /// LV busbar of the station feeding `lv_grid`.
    pub fn station_bus(&self, lv_grid: GridId) -> Option<BusId> {
        self.station_transformers(lv_grid).first().map(|t| t.bus1)
    }

    /// MV bus an LV grid is attached to.
    pub fn station_primary_bus(&self, lv_grid: GridId) -> Option<BusId> {
        self.station_transformers(lv_grid).first().map(|t| t.bus0)
    }

    /// Feeding point of a grid: the slack bus for MV, the station secondary for LV.
    pub fn feeding_bus(&self, grid: GridId) -> Option<BusId> {
        match self.grids.get(&grid)?.level {
            VoltageLevel::Mv => self.slack_bus,
            VoltageLevel::Lv => self.station_bus(grid),
        }
    }

    pub fn stats(&self) -> TopologyStats {
        TopologyStats {
            num_grids: self.grids.len(),
            num_lv_grids: self.lv_grids().count(),
            num_buses: self.buses.len(),
            num_lines: self.lines.len(),
            num_transformers: self.transformers.len(),
            num_loads: self.loads.len(),
            num_generators: self.generators.len(),
        }
    }

    /// Record every structural problem without stopping at the first one.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        if self.mv_grid().is_none() {
            diag.add_error("structure", "topology has no MV grid");
        }
        if self.slack_bus.is_none() {
            diag.add_error("structure", "no slack bus declared");
        }

        for bus in self.buses.values() {
            if let Some(sub) = bus.substation {
                if !self.buses.contains_key(&sub) {
                    diag.add_warning_with_entity(
                        "reference",
                        &format!("substation {sub} does not exist"),
                        &bus.id.to_string(),
                    );
                }
            }
        }

        for line in self.lines.values() {
            if !line.is_complete() {
                diag.add_warning_with_entity(
                    "parameters",
                    "electrical parameters unset, will be defaulted from the catalog",
                    &line.id.to_string(),
                );
            }
            if line.length_km == 0.0 {
                diag.add_warning_with_entity("parameters", "zero length", &line.id.to_string());
            }
        }

        for transformer in self.transformers.values() {
            if !transformer.is_complete() {
                diag.add_warning_with_entity(
                    "parameters",
                    "rating or impedance unset, will be defaulted from the catalog",
                    &transformer.id.to_string(),
                );
            }
        }

        for grid in self.lv_grids() {
            if self.station_transformers(grid.id).is_empty() {
                diag.add_error_with_entity(
                    "connectivity",
                    "LV grid has no station transformer",
                    &grid.id.to_string(),
                );
            }
        }

        if !graph_utils::BusGraph::build(self).is_radial() {
            diag.add_warning("connectivity", "network is meshed; radial power flow will reject it");
        }

        if self.slack_bus.is_some() {
            for bus in graph_utils::unreachable_buses(self) {
                diag.add_error_with_entity(
                    "connectivity",
                    "bus is not reachable from the slack bus",
                    &bus.to_string(),
                );
            }
        }
    }

    pub fn validate(&self) -> Diagnostics {
        let mut diag = Diagnostics::new();
        self.validate_into(&mut diag);
        diag
    }
}

/// Flat serialized form; deserialization replays it through the `add_*`
/// methods so every insertion check applies to files as well.
#[derive(Serialize, Deserialize)]
struct TopologyRecord {
    name: String,
    #[serde(default)]
    slack_bus: Option<BusId>,
    grids: Vec<Grid>,
    buses: Vec<Bus>,
    #[serde(default)]
    lines: Vec<Line>,
    #[serde(default)]
    transformers: Vec<Transformer>,
    #[serde(default)]
    loads: Vec<Load>,
    #[serde(default)]
    generators: Vec<Generator>,
}

impl From<Topology> for TopologyRecord {
    fn from(topology: Topology) -> Self {
        Self {
            name: topology.name,
            slack_bus: topology.slack_bus,
            grids: topology.grids.into_values().collect(),
            buses: topology.buses.into_values().collect(),
            lines: topology.lines.into_values().collect(),
            transformers: topology.transformers.into_values().collect(),
            loads: topology.loads.into_values().collect(),
            generators: topology.generators.into_values().collect(),
        }
    }
}

impl TryFrom<TopologyRecord> for Topology {
    type Error = GridError;

    fn try_from(record: TopologyRecord) -> Result<Self, Self::Error> {
        let mut topology = Topology::new(record.name);
        for grid in record.grids {
            topology.add_grid(grid)?;
        }
        for bus in record.buses {
            topology.add_bus(bus)?;
        }
        for line in record.lines {
            topology.add_line(line)?;
        }
        for transformer in record.transformers {
            topology.add_transformer(transformer)?;
        }
        for load in record.loads {
            topology.add_load(load)?;
        }
        for generator in record.generators {
            topology.add_generator(generator)?;
        }
        if let Some(slack) = record.slack_bus {
            topology.set_slack_bus(slack)?;
        }
        Ok(topology)
    }
}

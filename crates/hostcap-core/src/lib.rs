//! # hostcap-core: Distribution Grid Topology Model
//!
//! Data structures shared by the translation, power-flow and reinforcement
//! crates.
//!
//! ## Design Philosophy
//!
//! A distribution grid is stored as an **arena of components addressed by
//! stable typed IDs** ([`Topology`]):
//! - **Grids**: one medium-voltage (MV) grid and any number of low-voltage (LV) grids
//! - **Buses**: belong to exactly one grid, carry their voltage level
//! - **Lines**: connect two buses of the same grid
//! - **Transformers**: connect an MV bus (primary) to an LV bus (secondary)
//! - **Loads / Generators**: attach to a bus and reference their time series by ID
//!
//! Components never hold references to each other, only IDs. This keeps
//! ownership acyclic and makes table emission a pure function of the arena.
//! Graph queries (connectivity, feeder paths) build a `petgraph` view on
//! demand, see [`graph_utils`].
//!
//! ## Quick Start
//!
//! ```rust
//! use hostcap_core::*;
//!
//! let mut topology = Topology::new("feeder");
//! topology.add_grid(Grid::new(GridId::new(1), "MV", VoltageLevel::Mv)).unwrap();
//! topology
//!     .add_bus(Bus::new(BusId::new(1), "station", GridId::new(1), VoltageLevel::Mv, Kilovolts(20.0)))
//!     .unwrap();
//! topology
//!     .add_bus(Bus::new(BusId::new(2), "node", GridId::new(1), VoltageLevel::Mv, Kilovolts(20.0)))
//!     .unwrap();
//! topology.set_slack_bus(BusId::new(1)).unwrap();
//! topology
//!     .add_line(Line::new(LineId::new(1), "cable", BusId::new(1), BusId::new(2), 1.5))
//!     .unwrap();
//! assert_eq!(topology.stats().num_lines, 1);
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] - Standard equipment types and minimal-sufficient lookups
//! - [`diagnostics`] - Validation reporting
//! - [`graph_utils`] - Connectivity and feeder path queries
//! - [`units`] - Typed physical quantities

use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod snapshot;
pub mod topology;
pub mod units;

pub use catalog::{EquipmentCatalog, LineType, TransformerType};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GridError, GridResult};
pub use snapshot::{Snapshot, SnapshotRange};
pub use topology::{Topology, TopologyStats};
pub use units::{Kilovolts, MegavoltAmperes, Megawatts};

/// Nominal system frequency used to turn per-km inductance into reactance.
pub const DEFAULT_FREQUENCY_HZ: f64 = 50.0;

macro_rules! id_type {
    ($name:ident, $label:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            pub fn new(value: usize) -> Self {
                $name(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} {}", $label, self.0)
            }
        }
    };
}

id_type!(GridId, "Grid");
id_type!(BusId, "Bus");
id_type!(LineId, "Line");
id_type!(TransformerId, "Transformer");
id_type!(LoadId, "Load");
id_type!(GeneratorId, "Generator");

/// Voltage level of a grid or bus. Never changes once a bus is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoltageLevel {
    Mv,
    Lv,
}

impl VoltageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoltageLevel::Mv => "mv",
            VoltageLevel::Lv => "lv",
        }
    }
}

impl std::fmt::Display for VoltageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any component that can appear in solver tables or results.
///
/// The aggregated variants stand for the collapsed load/generation of a whole
/// LV grid when only the MV level is analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ComponentRef {
    Bus(BusId),
    Line(LineId),
    Transformer(TransformerId),
    Load(LoadId),
    Generator(GeneratorId),
    AggregatedLoad(GridId),
    AggregatedGenerator(GridId),
}

impl std::fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentRef::Bus(id) => write!(f, "{id}"),
            ComponentRef::Line(id) => write!(f, "{id}"),
            ComponentRef::Transformer(id) => write!(f, "{id}"),
            ComponentRef::Load(id) => write!(f, "{id}"),
            ComponentRef::Generator(id) => write!(f, "{id}"),
            ComponentRef::AggregatedLoad(grid) => write!(f, "aggregated load of {grid}"),
            ComponentRef::AggregatedGenerator(grid) => {
                write!(f, "aggregated generator of {grid}")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub id: GridId,
    pub name: String,
    pub level: VoltageLevel,
}

impl Grid {
    pub fn new(id: GridId, name: impl Into<String>, level: VoltageLevel) -> Self {
        Self {
            id,
            name: name.into(),
            level,
        }
    }

    /// Stable label used in table keys, e.g. `MVGrid_1` or `LVGrid_4`.
    pub fn label(&self) -> String {
        match self.level {
            VoltageLevel::Mv => format!("MVGrid_{}", self.id.value()),
            VoltageLevel::Lv => format!("LVGrid_{}", self.id.value()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub grid: GridId,
    pub level: VoltageLevel,
    /// Nominal line-to-line voltage
    pub v_nom: Kilovolts,
    /// Substation this bus is supplied from (lookup only)
    #[serde(default)]
    pub substation: Option<BusId>,
}

impl Bus {
    pub fn new(
        id: BusId,
        name: impl Into<String>,
        grid: GridId,
        level: VoltageLevel,
        v_nom: Kilovolts,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            grid,
            level,
            v_nom,
            substation: None,
        }
    }

    pub fn with_substation(mut self, substation: BusId) -> Self {
        self.substation = Some(substation);
        self
    }
}

fn one() -> u32 {
    1
}

/// A line section between two buses of the same grid.
///
/// Electrical parameters are stored **per circuit**; the effective values
/// seen by the solver divide impedance (and multiply rating) by the number of
/// parallel circuits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,
    pub name: String,
    bus0: BusId,
    bus1: BusId,
    pub length_km: f64,
    /// Series resistance per circuit in ohm
    #[serde(default)]
    pub r_ohm: Option<f64>,
    /// Series reactance per circuit in ohm
    #[serde(default)]
    pub x_ohm: Option<f64>,
    /// Thermal rating per circuit
    #[serde(default)]
    pub s_nom: Option<MegavoltAmperes>,
    /// Name of the catalog type, unset until imported with one or reinforced
    #[serde(default)]
    pub std_type: Option<String>,
    #[serde(default = "one")]
    num_parallel: u32,
}

impl Line {
    pub fn new(id: LineId, name: impl Into<String>, bus0: BusId, bus1: BusId, length_km: f64) -> Self {
        Self {
            id,
            name: name.into(),
            bus0,
            bus1,
            length_km,
            r_ohm: None,
            x_ohm: None,
            s_nom: None,
            std_type: None,
            num_parallel: 1,
        }
    }

    /// Attach per-circuit impedance in ohm.
    pub fn with_impedance(mut self, r_ohm: f64, x_ohm: f64) -> Self {
        self.r_ohm = Some(r_ohm);
        self.x_ohm = Some(x_ohm);
        self
    }

    /// Attach a per-circuit thermal rating.
    pub fn with_s_nom(mut self, s_nom_mva: f64) -> Self {
        self.s_nom = Some(MegavoltAmperes(s_nom_mva));
        self
    }

    pub fn with_parallel(mut self, circuits: u32) -> Self {
        self.num_parallel = circuits.max(1);
        self
    }

    /// Build a line section with parameters taken from a catalog type.
    pub fn from_type(
        id: LineId,
        name: impl Into<String>,
        bus0: BusId,
        bus1: BusId,
        length_km: f64,
        line_type: &LineType,
    ) -> Self {
        let mut line = Self::new(id, name, bus0, bus1, length_km);
        line.apply_type(line_type, DEFAULT_FREQUENCY_HZ);
        line
    }

    pub fn bus0(&self) -> BusId {
        self.bus0
    }

    pub fn bus1(&self) -> BusId {
        self.bus1
    }

    pub fn num_parallel(&self) -> u32 {
        self.num_parallel
    }

    /// True when impedance and rating are set.
    pub fn is_complete(&self) -> bool {
        self.r_ohm.is_some() && self.x_ohm.is_some() && self.s_nom.is_some()
    }

    /// Resistance of all parallel circuits combined.
    pub fn effective_r_ohm(&self) -> Option<f64> {
        self.r_ohm.map(|r| r / self.num_parallel as f64)
    }

    /// Reactance of all parallel circuits combined.
    pub fn effective_x_ohm(&self) -> Option<f64> {
        self.x_ohm.map(|x| x / self.num_parallel as f64)
    }

    /// Thermal rating of all parallel circuits combined.
    pub fn rating(&self) -> Option<MegavoltAmperes> {
        self.s_nom.map(|s| s * self.num_parallel as f64)
    }

    /// Replace per-circuit parameters with those of `line_type`:
    /// r = length·R', x = length·L'·ω/1000, s_nom = √3·I_th·U_n/1000.
    ///
    /// The parallel count is left untouched.
    pub fn apply_type(&mut self, line_type: &LineType, frequency_hz: f64) {
        self.r_ohm = Some(self.length_km * line_type.r_ohm_per_km);
        self.x_ohm = Some(self.length_km * line_type.x_ohm_per_km(frequency_hz));
        self.s_nom = Some(line_type.s_nom());
        self.std_type = Some(line_type.name.clone());
    }

    /// Raise the number of parallel circuits to at least `circuits`.
    /// Never removes capacity.
    pub fn ensure_parallel(&mut self, circuits: u32) {
        self.num_parallel = self.num_parallel.max(circuits);
    }

    pub fn add_parallel_circuit(&mut self) {
        self.num_parallel += 1;
    }
}

/// An MV/LV transformer connecting an MV bus (`bus0`) with an LV station bus (`bus1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformer {
    pub id: TransformerId,
    pub name: String,
    /// MV primary
    bus0: BusId,
    /// LV station busbar
    bus1: BusId,
    /// Rated power per unit
    #[serde(default)]
    pub s_nom: Option<MegavoltAmperes>,
    /// Series resistance per unit on the transformer's own rating
    #[serde(default)]
    pub r_pu: Option<f64>,
    /// Series reactance per unit on the transformer's own rating
    #[serde(default)]
    pub x_pu: Option<f64>,
    #[serde(default)]
    pub std_type: Option<String>,
    #[serde(default = "one")]
    num_parallel: u32,
}

impl Transformer {
    pub fn new(id: TransformerId, name: impl Into<String>, bus0: BusId, bus1: BusId) -> Self {
        Self {
            id,
            name: name.into(),
            bus0,
            bus1,
            s_nom: None,
            r_pu: None,
            x_pu: None,
            std_type: None,
            num_parallel: 1,
        }
    }

    pub fn from_type(
        id: TransformerId,
        name: impl Into<String>,
        bus0: BusId,
        bus1: BusId,
        transformer_type: &TransformerType,
    ) -> Self {
        let mut transformer = Self::new(id, name, bus0, bus1);
        transformer.apply_type(transformer_type);
        transformer
    }

    pub fn with_parallel(mut self, units: u32) -> Self {
        self.num_parallel = units.max(1);
        self
    }

    pub fn bus0(&self) -> BusId {
        self.bus0
    }

    pub fn bus1(&self) -> BusId {
        self.bus1
    }

    pub fn num_parallel(&self) -> u32 {
        self.num_parallel
    }

    pub fn is_complete(&self) -> bool {
        self.s_nom.is_some() && self.r_pu.is_some() && self.x_pu.is_some()
    }

    /// Combined rating of all parallel units.
    pub fn rating(&self) -> Option<MegavoltAmperes> {
        self.s_nom.map(|s| s * self.num_parallel as f64)
    }

    pub fn apply_type(&mut self, transformer_type: &TransformerType) {
        self.s_nom = Some(transformer_type.s_nom);
        self.r_pu = Some(transformer_type.r_pu);
        self.x_pu = Some(transformer_type.x_pu);
        self.std_type = Some(transformer_type.name.clone());
    }

    pub fn ensure_parallel(&mut self, units: u32) {
        self.num_parallel = self.num_parallel.max(units);
    }

    pub fn add_parallel_unit(&mut self) {
        self.num_parallel += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    Residential,
    Retail,
    Industrial,
    Agricultural,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Residential => "residential",
            Sector::Retail => "retail",
            Sector::Industrial => "industrial",
            Sector::Agricultural => "agricultural",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    pub sector: Sector,
    /// Annual energy consumption in MWh
    #[serde(default)]
    pub annual_consumption_mwh: f64,
    /// Explicit peak load; derived from consumption when unset
    #[serde(default)]
    pub peak_load: Option<Megawatts>,
    /// Reference into the time series provider
    #[serde(default)]
    pub timeseries_ref: Option<String>,
}

impl Load {
    pub fn new(id: LoadId, name: impl Into<String>, bus: BusId, sector: Sector) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            sector,
            annual_consumption_mwh: 0.0,
            peak_load: None,
            timeseries_ref: None,
        }
    }

    pub fn with_consumption(mut self, annual_mwh: f64) -> Self {
        self.annual_consumption_mwh = annual_mwh;
        self
    }

    pub fn with_peak_load(mut self, peak_mw: f64) -> Self {
        self.peak_load = Some(Megawatts(peak_mw));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    Solar,
    Wind,
    Gas,
    Biomass,
    Hydro,
    Other,
}

impl Technology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Solar => "solar",
            Technology::Wind => "wind",
            Technology::Gas => "gas",
            Technology::Biomass => "biomass",
            Technology::Hydro => "hydro",
            Technology::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generator {
    pub id: GeneratorId,
    pub name: String,
    pub bus: BusId,
    pub technology: Technology,
    #[serde(default)]
    pub subtype: Option<String>,
    /// Nominal capacity
    pub p_nom: Megawatts,
    #[serde(default)]
    pub timeseries_ref: Option<String>,
}

impl Generator {
    pub fn new(
        id: GeneratorId,
        name: impl Into<String>,
        bus: BusId,
        technology: Technology,
        p_nom_mw: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            technology,
            subtype: None,
            p_nom: Megawatts(p_nom_mw),
            timeseries_ref: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cable() -> LineType {
        LineType {
            name: "NA2XS2Y 3x1x150 RM/25".to_string(),
            u_n: Kilovolts(20.0),
            r_ohm_per_km: 0.206,
            l_mh_per_km: 0.4011,
            i_max_th_a: 319.0,
        }
    }

    #[test]
    fn parallel_circuits_scale_effective_parameters() {
        let line = Line::new(LineId::new(1), "l", BusId::new(1), BusId::new(2), 2.0)
            .with_impedance(0.4, 0.2)
            .with_s_nom(10.0)
            .with_parallel(2);
        assert!((line.effective_r_ohm().unwrap() - 0.2).abs() < 1e-12);
        assert!((line.effective_x_ohm().unwrap() - 0.1).abs() < 1e-12);
        assert!((line.rating().unwrap().value() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn applying_a_type_uses_length_and_frequency() {
        let mut line = Line::new(LineId::new(1), "l", BusId::new(1), BusId::new(2), 1.5);
        line.apply_type(&cable(), 50.0);
        let omega = 2.0 * std::f64::consts::PI * 50.0;
        assert!((line.r_ohm.unwrap() - 1.5 * 0.206).abs() < 1e-12);
        assert!((line.x_ohm.unwrap() - 1.5 * 0.4011 * omega / 1e3).abs() < 1e-12);
        assert!((line.s_nom.unwrap().value() - 3f64.sqrt() * 319.0 * 20.0 / 1e3).abs() < 1e-12);
        assert_eq!(line.std_type.as_deref(), Some("NA2XS2Y 3x1x150 RM/25"));
    }

    #[test]
    fn parallel_count_never_decreases() {
        let mut line = Line::new(LineId::new(1), "l", BusId::new(1), BusId::new(2), 1.0)
            .with_parallel(3);
        line.ensure_parallel(2);
        assert_eq!(line.num_parallel(), 3);
        line.add_parallel_circuit();
        assert_eq!(line.num_parallel(), 4);
        assert_eq!(
            Line::new(LineId::new(2), "l", BusId::new(1), BusId::new(2), 1.0)
                .with_parallel(0)
                .num_parallel(),
            1
        );
    }

    #[test]
    fn grid_labels_encode_level() {
        assert_eq!(Grid::new(GridId::new(1), "mv", VoltageLevel::Mv).label(), "MVGrid_1");
        assert_eq!(Grid::new(GridId::new(7), "lv", VoltageLevel::Lv).label(), "LVGrid_7");
    }

    #[test]
    fn component_ref_display() {
        assert_eq!(ComponentRef::Line(LineId::new(3)).to_string(), "Line 3");
        assert_eq!(
            ComponentRef::AggregatedLoad(GridId::new(2)).to_string(),
            "aggregated load of Grid 2"
        );
    }
}

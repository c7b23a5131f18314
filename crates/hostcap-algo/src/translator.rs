//! Topology ↔ solver table translation.
//!
//! Emission is a pure function of the topology, the time series and the
//! analysis mode. Parameters the solver needs but the topology lacks are
//! filled beforehand by [`Translator::resolve_missing_parameters`], which is
//! the only place where this module mutates a topology.

use hostcap_core::{
    Bus, BusId, ComponentRef, EquipmentCatalog, GridError, GridId, GridResult, Kilovolts, LineId,
    LineType, SnapshotRange, Topology, TransformerId, TransformerType, VoltageLevel,
    DEFAULT_FREQUENCY_HZ,
};
use hostcap_ts::{PowerSeries, TimeSeries};
use tracing::{debug, warn};

use crate::mode::AnalysisMode;
use crate::tables::{BusRow, InjectionRow, LineRow, SolverTables, TransformerRow};

pub struct Translator<'a> {
    catalog: &'a EquipmentCatalog,
    frequency_hz: f64,
}

impl<'a> Translator<'a> {
    pub fn new(catalog: &'a EquipmentCatalog) -> Self {
        Self {
            catalog,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
        }
    }

    pub fn with_frequency(mut self, frequency_hz: f64) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }

    /// Fill unset line and transformer parameters from the smallest catalog
    /// entry of the matching voltage class.
    ///
    /// Only missing fields are written; values already present are kept.
    /// Returns the defaulted components. A component that cannot be
    /// defaulted (no catalog entry for its class) is an
    /// [`GridError::IncompleteTopology`].
    pub fn resolve_missing_parameters(
        &self,
        topology: &mut Topology,
    ) -> GridResult<Vec<ComponentRef>> {
        let mut line_plan: Vec<(LineId, LineType)> = Vec::new();
        for line in topology.lines().filter(|l| !l.is_complete()) {
            let v_nom = bus_voltage(topology, line.bus0())?;
            let line_type = self.catalog.minimal_line_type(v_nom).map_err(|e| {
                GridError::incomplete(line.id, format!("parameters unset and cannot be defaulted: {e}"))
            })?;
            line_plan.push((line.id, line_type.clone()));
        }

        let mut transformer_plan: Vec<(TransformerId, TransformerType)> = Vec::new();
        for transformer in topology.transformers().filter(|t| !t.is_complete()) {
            let (primary, secondary) = topology
                .transformer_voltages(transformer)
                .ok_or_else(|| GridError::incomplete(transformer.id, "endpoint bus missing"))?;
            let transformer_type = self.catalog.minimal_transformer_type(primary, secondary).map_err(|e| {
                GridError::incomplete(
                    transformer.id,
                    format!("parameters unset and cannot be defaulted: {e}"),
                )
            })?;
            transformer_plan.push((transformer.id, transformer_type.clone()));
        }

        let mut defaulted = Vec::with_capacity(line_plan.len() + transformer_plan.len());
        for (id, line_type) in line_plan {
            if let Some(line) = topology.line_mut(id) {
                let length = line.length_km;
                line.r_ohm.get_or_insert(length * line_type.r_ohm_per_km);
                line.x_ohm
                    .get_or_insert(length * line_type.x_ohm_per_km(self.frequency_hz));
                line.s_nom.get_or_insert(line_type.s_nom());
                line.std_type.get_or_insert_with(|| line_type.name.clone());
                warn!(line = %id, std_type = %line_type.name, "defaulted missing line parameters");
                defaulted.push(ComponentRef::Line(id));
            }
        }
        for (id, transformer_type) in transformer_plan {
            if let Some(transformer) = topology.transformer_mut(id) {
                transformer.s_nom.get_or_insert(transformer_type.s_nom);
                transformer.r_pu.get_or_insert(transformer_type.r_pu);
                transformer.x_pu.get_or_insert(transformer_type.x_pu);
                transformer
                    .std_type
                    .get_or_insert_with(|| transformer_type.name.clone());
                warn!(transformer = %id, std_type = %transformer_type.name, "defaulted missing transformer parameters");
                defaulted.push(ComponentRef::Transformer(id));
            }
        }
        Ok(defaulted)
    }

    /// Emit solver tables for `mode`.
    ///
    /// - `Full`: every grid, no aggregation, topology slack bus as reference.
    /// - `MvOnly`: MV grid, station transformers and their LV busbars; the
    ///   loads and generators of each LV grid are summed into one aggregated
    ///   load and one aggregated generator at the station busbar.
    /// - `LvOnly`: LV grids and station transformers; every station's MV-side
    ///   bus becomes a slack so each LV grid is solved on its own.
    ///
    /// Only the snapshots of `series` inside `range` are emitted.
    pub fn to_tables(
        &self,
        topology: &Topology,
        series: &TimeSeries,
        mode: AnalysisMode,
        range: &SnapshotRange,
    ) -> GridResult<SolverTables> {
        let sliced;
        let series = if range.is_all() {
            series
        } else {
            sliced = series.slice(range)?;
            &sliced
        };
        series.validate_against(topology)?;
        let mut tables = SolverTables::new(mode, series.snapshots().to_vec());

        let mut included = std::collections::BTreeSet::new();
        let slack = topology.slack_bus();

        for bus in topology.buses() {
            let emit = match mode {
                AnalysisMode::Full => true,
                AnalysisMode::MvOnly => {
                    bus.level == VoltageLevel::Mv || is_station_secondary(topology, bus.id)
                }
                AnalysisMode::LvOnly => {
                    bus.level == VoltageLevel::Lv || is_station_primary(topology, bus.id)
                }
            };
            if !emit {
                continue;
            }
            let is_slack = match mode {
                AnalysisMode::LvOnly => bus.level == VoltageLevel::Mv,
                _ => Some(bus.id) == slack,
            };
            let key = bus_key(topology, bus)?;
            tables.keys.insert(key.clone(), ComponentRef::Bus(bus.id))?;
            tables.buses.push(BusRow {
                key,
                v_nom_kv: bus.v_nom.value(),
                level: bus.level,
                is_slack,
            });
            included.insert(bus.id);
        }
        if mode != AnalysisMode::LvOnly && slack.is_none() {
            return Err(GridError::incomplete("topology", "no slack bus declared"));
        }

        for line in topology.lines() {
            if !(included.contains(&line.bus0()) && included.contains(&line.bus1())) {
                continue;
            }
            let level = require_bus(topology, line.bus0())?.level;
            let in_scope = match mode {
                AnalysisMode::Full => true,
                AnalysisMode::MvOnly => level == VoltageLevel::Mv,
                AnalysisMode::LvOnly => level == VoltageLevel::Lv,
            };
            if !in_scope {
                continue;
            }
            let (Some(r_ohm), Some(x_ohm), Some(s_nom)) =
                (line.effective_r_ohm(), line.effective_x_ohm(), line.rating())
            else {
                return Err(GridError::incomplete(
                    line.id,
                    "electrical parameters unset; resolve missing parameters first",
                ));
            };
            let grid = bus_grid(topology, line.bus0())?;
            let key = format!("Line_{}_{}", grid_label(topology, grid)?, line.id.value());
            tables.keys.insert(key.clone(), ComponentRef::Line(line.id))?;
            tables.lines.push(LineRow {
                key,
                bus0: key_of(&tables, line.bus0())?,
                bus1: key_of(&tables, line.bus1())?,
                length_km: line.length_km,
                r_ohm,
                x_ohm,
                s_nom_mva: s_nom.value(),
                num_parallel: line.num_parallel(),
                std_type: line.std_type.clone(),
            });
        }

        for transformer in topology.transformers() {
            if !(included.contains(&transformer.bus0()) && included.contains(&transformer.bus1())) {
                continue;
            }
            let (Some(s_nom), Some(r_pu), Some(x_pu)) =
                (transformer.rating(), transformer.r_pu, transformer.x_pu)
            else {
                return Err(GridError::incomplete(
                    transformer.id,
                    "rating or impedance unset; resolve missing parameters first",
                ));
            };
            let grid = bus_grid(topology, transformer.bus1())?;
            let key = format!("Transformer_{}_{}", grid_label(topology, grid)?, transformer.id.value());
            tables
                .keys
                .insert(key.clone(), ComponentRef::Transformer(transformer.id))?;
            tables.transformers.push(TransformerRow {
                key,
                bus0: key_of(&tables, transformer.bus0())?,
                bus1: key_of(&tables, transformer.bus1())?,
                s_nom_mva: s_nom.value(),
                r_pu,
                x_pu,
                num_parallel: transformer.num_parallel(),
                std_type: transformer.std_type.clone(),
            });
        }

        self.emit_injections(topology, series, mode, &mut tables)?;

        debug!(
            mode = %mode,
            buses = tables.buses.len(),
            lines = tables.lines.len(),
            transformers = tables.transformers.len(),
            loads = tables.loads.len(),
            generators = tables.generators.len(),
            "emitted solver tables"
        );
        tables.validate()?;
        Ok(tables)
    }

    fn emit_injections(
        &self,
        topology: &Topology,
        series: &TimeSeries,
        mode: AnalysisMode,
        tables: &mut SolverTables,
    ) -> GridResult<()> {
        let emit_level = |level: VoltageLevel| match mode {
            AnalysisMode::Full => true,
            AnalysisMode::MvOnly => level == VoltageLevel::Mv,
            AnalysisMode::LvOnly => level == VoltageLevel::Lv,
        };

        for load in topology.loads() {
            let bus = require_bus(topology, load.bus)?;
            if !emit_level(bus.level) {
                continue;
            }
            let ts = series
                .load(load.id)
                .ok_or_else(|| GridError::Validation(format!("no time series for {}", load.id)))?;
            let key = format!("Load_{}_{}", grid_label(topology, bus.grid)?, load.id.value());
            tables.keys.insert(key.clone(), ComponentRef::Load(load.id))?;
            tables.loads.push(InjectionRow {
                key,
                bus: key_of(tables, load.bus)?,
                nominal_mw: load.peak_load.map(|p| p.value()).unwrap_or_else(|| peak_of(ts)),
                p_set: ts.p.clone(),
                q_set: ts.q.clone(),
            });
        }

        for generator in topology.generators() {
            let bus = require_bus(topology, generator.bus)?;
            if !emit_level(bus.level) {
                continue;
            }
            let ts = series.generator(generator.id).ok_or_else(|| {
                GridError::Validation(format!("no time series for {}", generator.id))
            })?;
            let key = format!("Generator_{}_{}", grid_label(topology, bus.grid)?, generator.id.value());
            tables
                .keys
                .insert(key.clone(), ComponentRef::Generator(generator.id))?;
            tables.generators.push(InjectionRow {
                key,
                bus: key_of(tables, generator.bus)?,
                nominal_mw: generator.p_nom.value(),
                p_set: ts.p.clone(),
                q_set: ts.q.clone(),
            });
        }

        if mode == AnalysisMode::MvOnly {
            for grid in topology.lv_grids() {
                self.emit_aggregated(topology, series, grid.id, tables)?;
            }
        }
        Ok(())
    }

    /// Collapse one LV grid into an aggregated load and generator at its
    /// station busbar. Series are summed snapshot by snapshot.
    fn emit_aggregated(
        &self,
        topology: &Topology,
        series: &TimeSeries,
        grid: GridId,
        tables: &mut SolverTables,
    ) -> GridResult<()> {
        let station = topology
            .station_bus(grid)
            .ok_or_else(|| GridError::incomplete(grid, "LV grid has no station transformer"))?;
        let station_key = key_of(tables, station)?;
        let label = grid_label(topology, grid)?;
        let n = series.len();

        let loads: Vec<_> = topology.loads_in(grid).collect();
        if !loads.is_empty() {
            let mut sum = PowerSeries::new(vec![0.0; n], vec![0.0; n]);
            let mut nominal = 0.0;
            for load in loads {
                let ts = series
                    .load(load.id)
                    .ok_or_else(|| GridError::Validation(format!("no time series for {}", load.id)))?;
                accumulate(&mut sum, ts);
                nominal += load.peak_load.map(|p| p.value()).unwrap_or_else(|| peak_of(ts));
            }
            let key = format!("Load_aggregated_{label}");
            tables.keys.insert(key.clone(), ComponentRef::AggregatedLoad(grid))?;
            tables.loads.push(InjectionRow {
                key,
                bus: station_key.clone(),
                nominal_mw: nominal,
                p_set: sum.p,
                q_set: sum.q,
            });
        }

        let generators: Vec<_> = topology.generators_in(grid).collect();
        if !generators.is_empty() {
            let mut sum = PowerSeries::new(vec![0.0; n], vec![0.0; n]);
            let mut nominal = 0.0;
            for generator in generators {
                let ts = series.generator(generator.id).ok_or_else(|| {
                    GridError::Validation(format!("no time series for {}", generator.id))
                })?;
                accumulate(&mut sum, ts);
                nominal += generator.p_nom.value();
            }
            let key = format!("Generator_aggregated_{label}");
            tables
                .keys
                .insert(key.clone(), ComponentRef::AggregatedGenerator(grid))?;
            tables.generators.push(InjectionRow {
                key,
                bus: station_key,
                nominal_mw: nominal,
                p_set: sum.p,
                q_set: sum.q,
            });
        }
        Ok(())
    }
}

fn accumulate(sum: &mut PowerSeries, ts: &PowerSeries) {
    for (acc, v) in sum.p.iter_mut().zip(&ts.p) {
        *acc += v;
    }
    for (acc, v) in sum.q.iter_mut().zip(&ts.q) {
        *acc += v;
    }
}

fn peak_of(ts: &PowerSeries) -> f64 {
    ts.p.iter().copied().fold(0.0, f64::max)
}

fn require_bus(topology: &Topology, bus: BusId) -> GridResult<&Bus> {
    topology
        .bus(bus)
        .ok_or_else(|| GridError::incomplete(bus, "bus does not exist"))
}

fn bus_voltage(topology: &Topology, bus: BusId) -> GridResult<Kilovolts> {
    require_bus(topology, bus).map(|b| b.v_nom)
}

fn bus_grid(topology: &Topology, bus: BusId) -> GridResult<GridId> {
    require_bus(topology, bus).map(|b| b.grid)
}

fn grid_label(topology: &Topology, grid: GridId) -> GridResult<String> {
    topology
        .grid(grid)
        .map(|g| g.label())
        .ok_or_else(|| GridError::incomplete(grid, "grid does not exist"))
}

/// Table key of a bus, e.g. `Bus_MVGrid_1_17`.
pub fn bus_key(topology: &Topology, bus: &Bus) -> GridResult<String> {
    Ok(format!("Bus_{}_{}", grid_label(topology, bus.grid)?, bus.id.value()))
}

fn key_of(tables: &SolverTables, bus: BusId) -> GridResult<String> {
    tables
        .keys
        .key(ComponentRef::Bus(bus))
        .map(str::to_string)
        .ok_or_else(|| GridError::incomplete(bus, "bus not emitted for this analysis mode"))
}

fn is_station_secondary(topology: &Topology, bus: BusId) -> bool {
    topology.transformers().any(|t| t.bus1() == bus)
}

fn is_station_primary(topology: &Topology, bus: BusId) -> bool {
    topology.transformers().any(|t| t.bus0() == bus)
}

//! Reinforcement measures for one pass.
//!
//! A pass is planned against the committed topology and applied to a staged
//! clone. The caller swaps the clone in only once every violation of the
//! pass has been handled, so a failed pass never leaves a half-reinforced
//! network behind.
//!
//! | Violation                  | Measure                                         |
//! |----------------------------|-------------------------------------------------|
//! | voltage, LV station busbar | step the station transformer(s)                 |
//! | voltage, any other bus     | step every line on the feeder path to the bus   |
//! | overload, line/transformer | minimal sufficient type, else parallel circuits |
//!
//! Voltage measures target the element that causes the deviation. When the
//! station's MV primary is itself outside the violating bus's band at the
//! worst snapshot, the transformer is left alone and the MV feeder path to
//! the primary is stepped instead. Likewise an LV bus whose station busbar is
//! already outside the band is handled as a busbar violation.
//!
//! A "step" is the next larger catalog type, or one more parallel unit when
//! the element already uses the largest type. Each element is stepped at
//! most once per pass. Loading measures read the staged state, so an element
//! with both kinds of violation gets its voltage step first and the loading
//! requirement on top.

use std::collections::{HashMap, HashSet};

use hostcap_algo::{LimitConfig, PowerFlowResults, ViolationKind, ViolationRecord};
use hostcap_core::{
    graph_utils, BusId, ComponentRef, EquipmentCatalog, GridError, GridResult, Kilovolts, Line,
    LineId, MegavoltAmperes, Topology, Transformer, TransformerId, VoltageLevel,
};
use tracing::{debug, warn};

use crate::report::{EquipmentState, MeasureFailure, ReinforcementRecord};

/// Everything one pass produced.
#[derive(Debug)]
pub struct PassOutcome {
    /// Reinforced copy of the topology
    pub staged: Topology,
    pub applied: Vec<ReinforcementRecord>,
    pub failures: Vec<MeasureFailure>,
}

pub struct MeasurePlanner<'a> {
    catalog: &'a EquipmentCatalog,
    frequency_hz: f64,
    limits: LimitConfig,
}

impl<'a> MeasurePlanner<'a> {
    pub fn new(catalog: &'a EquipmentCatalog, frequency_hz: f64, limits: LimitConfig) -> Self {
        Self {
            catalog,
            frequency_hz,
            limits,
        }
    }

    /// Apply the measures for `violations` to a clone of `topology`.
    ///
    /// Violations are handled in the order given (MV before LV, voltage
    /// before loading), one group per component using its worst record.
    /// `results` is the solve the violations were found in. Missing catalog
    /// entries become [`MeasureFailure`]s; any other error aborts the pass.
    pub fn apply_pass(
        &self,
        topology: &Topology,
        results: &PowerFlowResults,
        violations: &[ViolationRecord],
        iteration: usize,
    ) -> GridResult<PassOutcome> {
        let mut pass = Pass {
            planner: self,
            committed: topology,
            results,
            staged: topology.clone(),
            iteration,
            stepped_lines: HashSet::new(),
            stepped_transformers: HashSet::new(),
            applied: Vec::new(),
            failures: Vec::new(),
        };

        for worst in worst_per_group(violations) {
            let outcome = match (worst.kind.is_voltage(), worst.component) {
                (true, ComponentRef::Bus(bus)) => pass.voltage_measure(bus, worst),
                (false, ComponentRef::Line(line)) => pass.line_loading_measure(line, worst),
                (false, ComponentRef::Transformer(transformer)) => {
                    pass.transformer_loading_measure(transformer, worst)
                }
                (_, other) => {
                    debug!(component = %other, kind = worst.kind.as_str(), "no measure for violation");
                    Ok(())
                }
            };
            match outcome {
                Ok(()) => {}
                Err(GridError::MissingCatalogEntry { component, detail }) => {
                    warn!(
                        component = %worst.component,
                        iteration,
                        "reinforcement skipped: missing catalog entry for {component}: {detail}"
                    );
                    pass.failures.push(MeasureFailure {
                        iteration,
                        component: worst.component,
                        reason: format!("missing catalog entry for {component}: {detail}"),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(PassOutcome {
            staged: pass.staged,
            applied: pass.applied,
            failures: pass.failures,
        })
    }
}

/// Worst record per (component, voltage/loading) group, in first-seen order.
fn worst_per_group(violations: &[ViolationRecord]) -> Vec<&ViolationRecord> {
    let mut order: Vec<&ViolationRecord> = Vec::new();
    let mut index: HashMap<(ComponentRef, bool), usize> = HashMap::new();
    for record in violations {
        let key = (record.component, record.kind.is_voltage());
        match index.get(&key) {
            Some(&i) => {
                if record.exceedance > order[i].exceedance {
                    order[i] = record;
                }
            }
            None => {
                index.insert(key, order.len());
                order.push(record);
            }
        }
    }
    order
}

struct Pass<'p, 'a> {
    planner: &'p MeasurePlanner<'a>,
    committed: &'p Topology,
    results: &'p PowerFlowResults,
    staged: Topology,
    iteration: usize,
    stepped_lines: HashSet<LineId>,
    stepped_transformers: HashSet<TransformerId>,
    applied: Vec<ReinforcementRecord>,
    failures: Vec<MeasureFailure>,
}

impl Pass<'_, '_> {
    fn voltage_measure(&mut self, bus: BusId, worst: &ViolationRecord) -> GridResult<()> {
        let stations: Vec<(TransformerId, BusId)> = self
            .committed
            .transformers()
            .filter(|t| t.bus1() == bus)
            .map(|t| (t.id, t.bus0()))
            .collect();
        if !stations.is_empty() {
            return self.station_voltage_measure(bus, &stations, worst);
        }

        if let Some(busbar) = self.lv_busbar_of(bus) {
            if self.beyond_limit(busbar, worst) {
                debug!(%bus, %busbar, "deviation already present at the station busbar");
                return self.voltage_measure(busbar, worst);
            }
        }
        self.step_feeder_path(bus, worst)
    }

    /// Step the station transformers feeding `busbar`, unless the MV primary
    /// is already outside the band; then the MV feeder path is the cause.
    fn station_voltage_measure(
        &mut self,
        busbar: BusId,
        stations: &[(TransformerId, BusId)],
        worst: &ViolationRecord,
    ) -> GridResult<()> {
        if let Some(&(_, primary)) = stations
            .iter()
            .find(|(_, primary)| self.beyond_limit(*primary, worst))
        {
            debug!(%busbar, %primary, "station primary outside the band, reinforcing the MV feeder");
            return self.step_feeder_path(primary, worst);
        }
        for &(id, _) in stations {
            self.step_transformer(id, worst)?;
        }
        Ok(())
    }

    fn step_feeder_path(&mut self, bus: BusId, worst: &ViolationRecord) -> GridResult<()> {
        let path = graph_utils::feeder_path(self.committed, bus).unwrap_or_default();
        if path.is_empty() {
            warn!(%bus, "voltage violation without a feeder path to reinforce");
            self.failures.push(MeasureFailure {
                iteration: self.iteration,
                component: worst.component,
                reason: format!("no line between the feeding point and {bus}"),
            });
            return Ok(());
        }
        for id in path {
            self.step_line(id, worst)?;
        }
        Ok(())
    }

    /// Station busbar of the LV grid holding `bus`, when `bus` is another LV bus.
    fn lv_busbar_of(&self, bus: BusId) -> Option<BusId> {
        let found = self.committed.bus(bus)?;
        if found.level != VoltageLevel::Lv {
            return None;
        }
        self.committed
            .feeding_bus(found.grid)
            .filter(|busbar| *busbar != bus)
    }

    /// True when `bus` alone already breaks the band of the violating bus, in
    /// the same direction, at the worst snapshot.
    fn beyond_limit(&self, bus: BusId, worst: &ViolationRecord) -> bool {
        let tolerance = self.planner.limits.voltage_tolerance(worst.level);
        let Some(v) = self.voltage_at(bus, worst) else {
            return false;
        };
        match worst.kind {
            ViolationKind::Undervoltage => v < 1.0 - tolerance,
            ViolationKind::Overvoltage => v > 1.0 + tolerance,
            ViolationKind::Overload => false,
        }
    }

    fn voltage_at(&self, bus: BusId, worst: &ViolationRecord) -> Option<f64> {
        let t = self
            .results
            .snapshots()
            .iter()
            .position(|s| *s == worst.snapshot)?;
        self.results.v_res(bus)?.get(t).copied()
    }

    fn step_line(&mut self, id: LineId, worst: &ViolationRecord) -> GridResult<()> {
        if !self.stepped_lines.insert(id) {
            return Ok(());
        }
        let u_n = self.line_voltage(id)?;
        let catalog = self.planner.catalog;
        let frequency_hz = self.planner.frequency_hz;
        let line = self.staged_line(id)?;
        let before = line_state(line);
        let current_rating = line.s_nom.unwrap_or_default();
        match catalog.next_line_type(u_n, line.std_type.as_deref(), current_rating)? {
            Some(line_type) => line.apply_type(line_type, frequency_hz),
            None => line.add_parallel_circuit(),
        }
        let after = line_state(line);
        self.record(ComponentRef::Line(id), worst, before, after);
        Ok(())
    }

    fn step_transformer(&mut self, id: TransformerId, worst: &ViolationRecord) -> GridResult<()> {
        if !self.stepped_transformers.insert(id) {
            return Ok(());
        }
        let (primary, secondary) = self.transformer_voltages(id)?;
        let catalog = self.planner.catalog;
        let transformer = self.staged_transformer(id)?;
        let before = transformer_state(transformer);
        let current_rating = transformer.s_nom.unwrap_or_default();
        match catalog.next_transformer_type(primary, secondary, current_rating)? {
            Some(transformer_type) => transformer.apply_type(transformer_type),
            None => transformer.add_parallel_unit(),
        }
        let after = transformer_state(transformer);
        self.record(ComponentRef::Transformer(id), worst, before, after);
        Ok(())
    }

    fn line_loading_measure(&mut self, id: LineId, worst: &ViolationRecord) -> GridResult<()> {
        let committed_rating = self
            .committed
            .line(id)
            .and_then(Line::rating)
            .ok_or_else(|| GridError::incomplete(id, "overloaded line without rating"))?;
        let required = self.required_capacity(worst, committed_rating);
        let u_n = self.line_voltage(id)?;
        let catalog = self.planner.catalog;
        let frequency_hz = self.planner.frequency_hz;

        let line = self.staged_line(id)?;
        if line.rating().unwrap_or_default().value() >= required.value() {
            return Ok(());
        }
        let before = line_state(line);
        let circuits = line.num_parallel();
        match catalog.sufficient_line_type(u_n, required, circuits)? {
            Some(line_type) => line.apply_type(line_type, frequency_hz),
            None => {
                let largest = catalog.largest_line_type(u_n)?;
                let per_circuit = line.s_nom.unwrap_or_default();
                let unit = if per_circuit.value() > largest.s_nom().value() {
                    per_circuit
                } else {
                    line.apply_type(largest, frequency_hz);
                    largest.s_nom()
                };
                line.ensure_parallel(parallel_count(required, unit));
            }
        }
        let after = line_state(line);
        self.record(ComponentRef::Line(id), worst, before, after);
        Ok(())
    }

    fn transformer_loading_measure(
        &mut self,
        id: TransformerId,
        worst: &ViolationRecord,
    ) -> GridResult<()> {
        let committed_rating = self
            .committed
            .transformer(id)
            .and_then(Transformer::rating)
            .ok_or_else(|| GridError::incomplete(id, "overloaded transformer without rating"))?;
        let required = self.required_capacity(worst, committed_rating);
        let (primary, secondary) = self.transformer_voltages(id)?;
        let catalog = self.planner.catalog;

        let transformer = self.staged_transformer(id)?;
        if transformer.rating().unwrap_or_default().value() >= required.value() {
            return Ok(());
        }
        let before = transformer_state(transformer);
        let units = transformer.num_parallel();
        match catalog.sufficient_transformer_type(primary, secondary, required, units)? {
            Some(transformer_type) => transformer.apply_type(transformer_type),
            None => {
                let largest = catalog.largest_transformer_type(primary, secondary)?;
                let per_unit = transformer.s_nom.unwrap_or_default();
                let unit = if per_unit.value() > largest.s_nom.value() {
                    per_unit
                } else {
                    transformer.apply_type(largest);
                    largest.s_nom
                };
                transformer.ensure_parallel(parallel_count(required, unit));
            }
        }
        let after = transformer_state(transformer);
        self.record(ComponentRef::Transformer(id), worst, before, after);
        Ok(())
    }

    /// Capacity the element needs so the worst snapshot sits at the limit.
    fn required_capacity(
        &self,
        worst: &ViolationRecord,
        rating: MegavoltAmperes,
    ) -> MegavoltAmperes {
        MegavoltAmperes(worst.value * rating.value() / self.planner.limits.thermal_limit)
    }

    fn line_voltage(&self, id: LineId) -> GridResult<Kilovolts> {
        self.committed
            .line(id)
            .and_then(|line| self.committed.bus(line.bus0()))
            .map(|bus| bus.v_nom)
            .ok_or_else(|| GridError::incomplete(id, "line endpoint missing"))
    }

    fn transformer_voltages(&self, id: TransformerId) -> GridResult<(Kilovolts, Kilovolts)> {
        self.committed
            .transformer(id)
            .and_then(|transformer| self.committed.transformer_voltages(transformer))
            .ok_or_else(|| GridError::incomplete(id, "transformer endpoint missing"))
    }

    fn staged_line(&mut self, id: LineId) -> GridResult<&mut Line> {
        self.staged
            .line_mut(id)
            .ok_or_else(|| GridError::incomplete(id, "line missing from staged topology"))
    }

    fn staged_transformer(&mut self, id: TransformerId) -> GridResult<&mut Transformer> {
        self.staged
            .transformer_mut(id)
            .ok_or_else(|| GridError::incomplete(id, "transformer missing from staged topology"))
    }

    fn record(
        &mut self,
        component: ComponentRef,
        worst: &ViolationRecord,
        before: EquipmentState,
        after: EquipmentState,
    ) {
        if before == after {
            return;
        }
        debug!(
            %component,
            iteration = self.iteration,
            trigger = worst.kind.as_str(),
            old_type = before.std_type.as_deref().unwrap_or("-"),
            new_type = after.std_type.as_deref().unwrap_or("-"),
            old_parallel = before.num_parallel,
            new_parallel = after.num_parallel,
            "measure applied"
        );
        self.applied.push(ReinforcementRecord {
            iteration: self.iteration,
            component,
            trigger: worst.kind,
            snapshot: worst.snapshot,
            before,
            after,
        });
    }
}

/// Parallel units of `unit` rating needed to carry `required`.
fn parallel_count(required: MegavoltAmperes, unit: MegavoltAmperes) -> u32 {
    if unit.value() <= 0.0 {
        return 1;
    }
    ((required.value() / unit.value()) - 1e-9).ceil().max(1.0) as u32
}

fn line_state(line: &Line) -> EquipmentState {
    EquipmentState {
        std_type: line.std_type.clone(),
        num_parallel: line.num_parallel(),
        rating_mva: line.rating().unwrap_or_default().value(),
    }
}

fn transformer_state(transformer: &Transformer) -> EquipmentState {
    EquipmentState {
        std_type: transformer.std_type.clone(),
        num_parallel: transformer.num_parallel(),
        rating_mva: transformer.rating().unwrap_or_default().value(),
    }
}

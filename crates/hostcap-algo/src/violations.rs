//! Technical-limit checks on a complete results set.

use hostcap_core::{ComponentRef, Snapshot, Topology, VoltageLevel};
use serde::{Deserialize, Serialize};

use crate::results::PowerFlowResults;

/// Technical limits per voltage level and element kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Allowed loading as a share of the rating
    pub thermal_limit: f64,
    /// Allowed deviation from nominal voltage on MV buses, in p.u.
    pub mv_voltage_tolerance: f64,
    /// Allowed deviation from nominal voltage on LV buses, in p.u.
    pub lv_voltage_tolerance: f64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            thermal_limit: 1.0,
            mv_voltage_tolerance: 0.10,
            lv_voltage_tolerance: 0.05,
        }
    }
}

impl LimitConfig {
    pub fn voltage_tolerance(&self, level: VoltageLevel) -> f64 {
        match level {
            VoltageLevel::Mv => self.mv_voltage_tolerance,
            VoltageLevel::Lv => self.lv_voltage_tolerance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    Overload,
    Undervoltage,
    Overvoltage,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::Overload => "overload",
            ViolationKind::Undervoltage => "undervoltage",
            ViolationKind::Overvoltage => "overvoltage",
        }
    }

    pub fn is_voltage(&self) -> bool {
        !matches!(self, ViolationKind::Overload)
    }
}

/// One limit breach of one component at one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub component: ComponentRef,
    pub level: VoltageLevel,
    pub snapshot: Snapshot,
    pub kind: ViolationKind,
    /// Loading ratio (overload) or voltage in p.u.
    pub value: f64,
    /// Amount beyond the limit, in the unit of `value`
    pub exceedance: f64,
}

fn phase(record: &ViolationRecord) -> (VoltageLevel, bool) {
    (record.level, !record.kind.is_voltage())
}

/// Check every bus, line and transformer of `results` against `limits`.
///
/// Records are ordered for reinforcement: MV before LV, voltage before
/// loading within a level, then by component and snapshot. Transformers
/// belong to the LV level of the grid they feed.
pub fn analyze_violations(
    topology: &Topology,
    results: &PowerFlowResults,
    limits: &LimitConfig,
) -> Vec<ViolationRecord> {
    let snapshots = results.snapshots();
    let mut records = Vec::new();

    for (bus_id, values) in results.buses() {
        let Some(bus) = topology.bus(*bus_id) else {
            continue;
        };
        let tolerance = limits.voltage_tolerance(bus.level);
        for (t, &v) in values.iter().enumerate() {
            let (kind, exceedance) = if v < 1.0 - tolerance {
                (ViolationKind::Undervoltage, (1.0 - tolerance) - v)
            } else if v > 1.0 + tolerance {
                (ViolationKind::Overvoltage, v - (1.0 + tolerance))
            } else {
                continue;
            };
            records.push(ViolationRecord {
                component: ComponentRef::Bus(*bus_id),
                level: bus.level,
                snapshot: snapshots[t],
                kind,
                value: v,
                exceedance,
            });
        }
    }

    for (line_id, series) in results.lines() {
        let Some(line) = topology.line(*line_id) else {
            continue;
        };
        let (Some(rating), Some(level)) = (
            line.rating(),
            topology.bus(line.bus0()).map(|b| b.level),
        ) else {
            continue;
        };
        push_overloads(
            &mut records,
            ComponentRef::Line(*line_id),
            level,
            &series.s,
            rating.value(),
            snapshots,
            limits,
        );
    }

    for (transformer_id, series) in results.transformers() {
        let Some(rating) = topology
            .transformer(*transformer_id)
            .and_then(|t| t.rating())
        else {
            continue;
        };
        push_overloads(
            &mut records,
            ComponentRef::Transformer(*transformer_id),
            VoltageLevel::Lv,
            &series.s,
            rating.value(),
            snapshots,
            limits,
        );
    }

    records.sort_by(|a, b| {
        phase(a)
            .cmp(&phase(b))
            .then_with(|| a.component.cmp(&b.component))
            .then_with(|| a.snapshot.cmp(&b.snapshot))
    });
    records
}

fn push_overloads(
    records: &mut Vec<ViolationRecord>,
    component: ComponentRef,
    level: VoltageLevel,
    flows: &[f64],
    rating: f64,
    snapshots: &[Snapshot],
    limits: &LimitConfig,
) {
    for (t, &s) in flows.iter().enumerate() {
        let loading = s / rating;
        if loading > limits.thermal_limit {
            records.push(ViolationRecord {
                component,
                level,
                snapshot: snapshots[t],
                kind: ViolationKind::Overload,
                value: loading,
                exceedance: loading - limits.thermal_limit,
            });
        }
    }
}

//! Worst-case scenario: one peak feed-in and one peak load snapshot built
//! from fixed utilization and power factors.

use hostcap_core::{GridError, GridResult, Sector, Snapshot, Technology, Topology, VoltageLevel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{PowerSeries, TimeSeries};

/// Epoch offset of the feed-in case snapshot (1970-01-01T00:00Z).
pub const FEEDIN_CASE: i64 = 0;
/// Epoch offset of the load case snapshot (1970-01-01T01:00Z).
pub const LOAD_CASE: i64 = 3600;

/// A factor that differs between the MV and LV level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelFactors {
    pub mv: f64,
    pub lv: f64,
}

impl LevelFactors {
    pub const fn uniform(value: f64) -> Self {
        Self {
            mv: value,
            lv: value,
        }
    }

    pub fn at(&self, level: VoltageLevel) -> f64 {
        match level {
            VoltageLevel::Mv => self.mv,
            VoltageLevel::Lv => self.lv,
        }
    }
}

/// Utilization factors applied in one of the two cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFactors {
    /// Share of nominal capacity fed in by solar generators
    pub solar: LevelFactors,
    /// Share of nominal capacity fed in by all other technologies
    pub other_generation: LevelFactors,
    /// Share of peak load drawn by loads
    pub load: LevelFactors,
}

impl CaseFactors {
    fn generation(&self, technology: &Technology, level: VoltageLevel) -> f64 {
        match technology {
            Technology::Solar => self.solar.at(level),
            _ => self.other_generation.at(level),
        }
    }
}

impl Default for CaseFactors {
    fn default() -> Self {
        Self {
            solar: LevelFactors::uniform(0.85),
            other_generation: LevelFactors::uniform(1.0),
            load: LevelFactors { mv: 0.15, lv: 0.1 },
        }
    }
}

/// Peak load per MWh of annual consumption, by sector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorRatios {
    pub residential: f64,
    pub retail: f64,
    pub industrial: f64,
    pub agricultural: f64,
}

impl SectorRatios {
    pub fn ratio(&self, sector: Sector) -> f64 {
        match sector {
            Sector::Residential => self.residential,
            Sector::Retail => self.retail,
            Sector::Industrial => self.industrial,
            Sector::Agricultural => self.agricultural,
        }
    }
}

impl Default for SectorRatios {
    fn default() -> Self {
        Self {
            residential: 0.00021372,
            retail: 0.0002404,
            industrial: 0.000132,
            agricultural: 0.00024036,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorstCaseConfig {
    pub feedin_case: CaseFactors,
    pub load_case: CaseFactors,
    pub generator_power_factor: LevelFactors,
    pub load_power_factor: LevelFactors,
    pub peak_load_ratio: SectorRatios,
}

impl Default for WorstCaseConfig {
    fn default() -> Self {
        Self {
            feedin_case: CaseFactors::default(),
            load_case: CaseFactors {
                solar: LevelFactors::uniform(0.0),
                other_generation: LevelFactors::uniform(0.0),
                load: LevelFactors::uniform(1.0),
            },
            generator_power_factor: LevelFactors { mv: 0.9, lv: 0.95 },
            load_power_factor: LevelFactors { mv: 0.9, lv: 0.95 },
            peak_load_ratio: SectorRatios::default(),
        }
    }
}

/// tan(acos(pf)): reactive per active power for a power factor.
fn q_per_p(power_factor: f64) -> GridResult<f64> {
    if !(power_factor > 0.0 && power_factor <= 1.0) {
        return Err(GridError::Config(format!(
            "power factor {power_factor} outside (0, 1]"
        )));
    }
    Ok(power_factor.acos().tan())
}

/// Synthesize the two-snapshot worst-case series for every generator and load.
///
/// Generators behave inductively (Q = -P·tan φ), loads consume reactive
/// power (Q = P·tan φ). A load without an explicit peak uses its annual
/// consumption times the sector's peak-load ratio.
pub fn worst_case(topology: &Topology, config: &WorstCaseConfig) -> GridResult<TimeSeries> {
    let snapshots = [FEEDIN_CASE, LOAD_CASE]
        .iter()
        .filter_map(|&secs| Snapshot::from_epoch_seconds(secs))
        .collect();
    let mut ts = TimeSeries::new(snapshots)?;

    for generator in topology.generators() {
        let level = topology
            .bus(generator.bus)
            .map(|b| b.level)
            .ok_or_else(|| GridError::incomplete(generator.id, "bus not found"))?;
        let tan_phi = q_per_p(config.generator_power_factor.at(level))?;
        let p_nom = generator.p_nom.value();
        let p = vec![
            p_nom * config.feedin_case.generation(&generator.technology, level),
            p_nom * config.load_case.generation(&generator.technology, level),
        ];
        let q = p.iter().map(|p| p * -tan_phi).collect();
        ts.insert_generator(generator.id, PowerSeries::new(p, q))?;
    }

    for load in topology.loads() {
        let level = topology
            .bus(load.bus)
            .map(|b| b.level)
            .ok_or_else(|| GridError::incomplete(load.id, "bus not found"))?;
        let tan_phi = q_per_p(config.load_power_factor.at(level))?;
        let peak = load
            .peak_load
            .map(|p| p.value())
            .unwrap_or_else(|| load.annual_consumption_mwh * config.peak_load_ratio.ratio(load.sector));
        let p = vec![
            peak * config.feedin_case.load.at(level),
            peak * config.load_case.load.at(level),
        ];
        let q = p.iter().map(|p| p * tan_phi).collect();
        ts.insert_load(load.id, PowerSeries::new(p, q))?;
    }

    debug!(
        generators = topology.generators().count(),
        loads = topology.loads().count(),
        "synthesized worst-case time series"
    );
    Ok(ts)
}

//! Per-component power injections over a set of snapshots.
//!
//! A [`TimeSeries`] holds active and reactive power for every generator and
//! load of a topology, either synthesized ([`worst_case`]) or read from a
//! directory of CSV files ([`load_csv_dir`]). It carries no behavior beyond
//! lookup, validation and snapshot selection; the translator consumes it.

use std::collections::BTreeMap;

use hostcap_core::{GeneratorId, GridError, GridResult, LoadId, Snapshot, SnapshotRange, Topology};
use serde::{Deserialize, Serialize};

mod csv_dir;
mod worst_case;

pub use csv_dir::load_csv_dir;
pub use worst_case::{
    worst_case, CaseFactors, LevelFactors, SectorRatios, WorstCaseConfig, FEEDIN_CASE, LOAD_CASE,
};

/// Active (MW) and reactive (Mvar) power of one component, one value per snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerSeries {
    pub p: Vec<f64>,
    pub q: Vec<f64>,
}

impl PowerSeries {
    pub fn new(p: Vec<f64>, q: Vec<f64>) -> Self {
        Self { p, q }
    }

    /// Active power only; reactive power is zero.
    pub fn active(p: Vec<f64>) -> Self {
        let q = vec![0.0; p.len()];
        Self { p, q }
    }

    pub fn len(&self) -> usize {
        self.p.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p.is_empty()
    }

    fn pick(&self, indices: &[usize]) -> Self {
        Self {
            p: indices.iter().map(|&i| self.p[i]).collect(),
            q: indices.iter().map(|&i| self.q[i]).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "TimeSeriesRecord", into = "TimeSeriesRecord")]
pub struct TimeSeries {
    snapshots: Vec<Snapshot>,
    generators: BTreeMap<GeneratorId, PowerSeries>,
    loads: BTreeMap<LoadId, PowerSeries>,
}

impl TimeSeries {
    /// Empty container for `snapshots`; they must be strictly increasing.
    pub fn new(snapshots: Vec<Snapshot>) -> GridResult<Self> {
        if snapshots.windows(2).any(|w| w[0] >= w[1]) {
            return Err(GridError::Validation(
                "snapshots must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            snapshots,
            generators: BTreeMap::new(),
            loads: BTreeMap::new(),
        })
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn check_length(&self, component: impl ToString, series: &PowerSeries) -> GridResult<()> {
        if series.p.len() != self.snapshots.len() || series.q.len() != self.snapshots.len() {
            return Err(GridError::Validation(format!(
                "{} has {} values, expected {}",
                component.to_string(),
                series.p.len().min(series.q.len()),
                self.snapshots.len()
            )));
        }
        Ok(())
    }

    pub fn insert_generator(&mut self, id: GeneratorId, series: PowerSeries) -> GridResult<()> {
        self.check_length(id, &series)?;
        self.generators.insert(id, series);
        Ok(())
    }

    pub fn insert_load(&mut self, id: LoadId, series: PowerSeries) -> GridResult<()> {
        self.check_length(id, &series)?;
        self.loads.insert(id, series);
        Ok(())
    }

    pub fn generator(&self, id: GeneratorId) -> Option<&PowerSeries> {
        self.generators.get(&id)
    }

    pub fn load(&self, id: LoadId) -> Option<&PowerSeries> {
        self.loads.get(&id)
    }

    pub fn generators(&self) -> impl Iterator<Item = (&GeneratorId, &PowerSeries)> {
        self.generators.iter()
    }

    pub fn loads(&self) -> impl Iterator<Item = (&LoadId, &PowerSeries)> {
        self.loads.iter()
    }

    /// Every generator and load of `topology` must have a series.
    pub fn validate_against(&self, topology: &Topology) -> GridResult<()> {
        if self.snapshots.is_empty() {
            return Err(GridError::Validation("time series has no snapshots".to_string()));
        }
        let missing: Vec<String> = topology
            .generators()
            .filter(|g| !self.generators.contains_key(&g.id))
            .map(|g| g.id.to_string())
            .chain(
                topology
                    .loads()
                    .filter(|l| !self.loads.contains_key(&l.id))
                    .map(|l| l.id.to_string()),
            )
            .collect();
        if !missing.is_empty() {
            return Err(GridError::Validation(format!(
                "no time series for {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Restrict to a subset of the stored snapshots, keeping their order.
    pub fn select(&self, snapshots: &[Snapshot]) -> GridResult<TimeSeries> {
        let mut indices = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let idx = self
                .snapshots
                .binary_search(snapshot)
                .map_err(|_| GridError::Validation(format!("snapshot {snapshot} not in time series")))?;
            indices.push(idx);
        }
        let mut selected = TimeSeries::new(indices.iter().map(|&i| self.snapshots[i]).collect())?;
        selected.generators = self
            .generators
            .iter()
            .map(|(id, s)| (*id, s.pick(&indices)))
            .collect();
        selected.loads = self
            .loads
            .iter()
            .map(|(id, s)| (*id, s.pick(&indices)))
            .collect();
        Ok(selected)
    }
}

impl TimeSeries {
    /// The snapshots inside `range`; an empty window is an error.
    pub fn slice(&self, range: &SnapshotRange) -> GridResult<TimeSeries> {
        if range.is_all() {
            return Ok(self.clone());
        }
        let selected = range.select(&self.snapshots);
        if selected.is_empty() {
            return Err(GridError::Validation(format!(
                "no snapshots in range {range}"
            )));
        }
        self.select(&selected)
    }
}

#[derive(Serialize, Deserialize)]
struct SeriesEntry<I> {
    id: I,
    #[serde(flatten)]
    series: PowerSeries,
}

#[derive(Serialize, Deserialize)]
struct TimeSeriesRecord {
    snapshots: Vec<Snapshot>,
    #[serde(default)]
    generators: Vec<SeriesEntry<GeneratorId>>,
    #[serde(default)]
    loads: Vec<SeriesEntry<LoadId>>,
}

impl From<TimeSeries> for TimeSeriesRecord {
    fn from(ts: TimeSeries) -> Self {
        Self {
            snapshots: ts.snapshots,
            generators: ts
                .generators
                .into_iter()
                .map(|(id, series)| SeriesEntry { id, series })
                .collect(),
            loads: ts
                .loads
                .into_iter()
                .map(|(id, series)| SeriesEntry { id, series })
                .collect(),
        }
    }
}

impl TryFrom<TimeSeriesRecord> for TimeSeries {
    type Error = GridError;

    fn try_from(record: TimeSeriesRecord) -> Result<Self, Self::Error> {
        let mut ts = TimeSeries::new(record.snapshots)?;
        for entry in record.generators {
            ts.insert_generator(entry.id, entry.series)?;
        }
        for entry in record.loads {
            ts.insert_load(entry.id, entry.series)?;
        }
        Ok(ts)
    }
}

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// One discrete time step for which a power flow is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub DateTime<Utc>);

impl Snapshot {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Snapshot(timestamp)
    }

    /// Snapshot at `secs` seconds after the Unix epoch.
    pub fn from_epoch_seconds(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Snapshot)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.0.timestamp()
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A window of snapshots, written `start..end` (end excluded) or
/// `start..=end`. Bounds are epoch seconds or RFC 3339 timestamps; either
/// side may be left open, and `..` selects everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotRange {
    start: Option<Snapshot>,
    end: Option<Snapshot>,
    inclusive_end: bool,
}

impl SnapshotRange {
    /// Every snapshot.
    pub fn all() -> Self {
        Self::default()
    }

    /// Snapshots in `[start, end)`.
    pub fn new(start: Option<Snapshot>, end: Option<Snapshot>) -> Self {
        Self {
            start,
            end,
            inclusive_end: false,
        }
    }

    pub fn is_all(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, snapshot: &Snapshot) -> bool {
        let after_start = self.start.map_or(true, |start| *snapshot >= start);
        let before_end = match (self.end, self.inclusive_end) {
            (None, _) => true,
            (Some(end), true) => *snapshot <= end,
            (Some(end), false) => *snapshot < end,
        };
        after_start && before_end
    }

    /// The members of `snapshots` inside the range, in their original order.
    pub fn select(&self, snapshots: &[Snapshot]) -> Vec<Snapshot> {
        snapshots
            .iter()
            .copied()
            .filter(|s| self.contains(s))
            .collect()
    }
}

fn parse_bound(text: &str) -> Result<Option<Snapshot>, GridError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if let Ok(secs) = text.parse::<i64>() {
        return Snapshot::from_epoch_seconds(secs)
            .map(Some)
            .ok_or_else(|| GridError::Parse(format!("epoch seconds out of range: {text}")));
    }
    DateTime::parse_from_rfc3339(text)
        .map(|t| Some(Snapshot(t.with_timezone(&Utc))))
        .map_err(|e| GridError::Parse(format!("invalid snapshot bound '{text}': {e}")))
}

impl FromStr for SnapshotRange {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end, inclusive_end) = if let Some((a, b)) = s.split_once("..=") {
            (a, b, true)
        } else if let Some((a, b)) = s.split_once("..") {
            (a, b, false)
        } else {
            return Err(GridError::Parse(format!(
                "invalid snapshot range '{s}'; expected start..end"
            )));
        };
        let range = Self {
            start: parse_bound(start)?,
            end: parse_bound(end)?,
            inclusive_end,
        };
        if inclusive_end && range.end.is_none() {
            return Err(GridError::Parse(format!("snapshot range '{s}' has '..=' without an end")));
        }
        if let (Some(a), Some(b)) = (range.start, range.end) {
            if a > b {
                return Err(GridError::Parse(format!("snapshot range '{s}' ends before it starts")));
            }
        }
        Ok(range)
    }
}

impl std::fmt::Display for SnapshotRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{}", start.epoch_seconds())?;
        }
        f.write_str(if self.inclusive_end { "..=" } else { ".." })?;
        if let Some(end) = self.end {
            write!(f, "{}", end.epoch_seconds())?;
        }
        Ok(())
    }
}

impl TryFrom<String> for SnapshotRange {
    type Error = GridError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SnapshotRange> for String {
    fn from(range: SnapshotRange) -> Self {
        range.to_string()
    }
}

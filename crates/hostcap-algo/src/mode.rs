use std::fmt;
use std::str::FromStr;

use hostcap_core::GridError;
use serde::{Deserialize, Serialize};

/// Which voltage levels a power-flow run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnalysisMode {
    /// MV and LV grids solved together
    #[serde(rename = "full")]
    Full,
    /// MV grid with every LV grid collapsed onto its station busbar
    #[default]
    #[serde(rename = "mv-only", alias = "mv")]
    MvOnly,
    /// LV grids only, each fed from its station's MV-side bus
    #[serde(rename = "lv-only", alias = "lv")]
    LvOnly,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Full => "full",
            AnalysisMode::MvOnly => "mv-only",
            AnalysisMode::LvOnly => "lv-only",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(AnalysisMode::Full),
            "mv" | "mv-only" | "mv_only" => Ok(AnalysisMode::MvOnly),
            "lv" | "lv-only" | "lv_only" => Ok(AnalysisMode::LvOnly),
            _ => Err(GridError::InvalidAnalysisMode(s.to_string())),
        }
    }
}

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hostcap_algo::{AnalysisMode, LimitConfig, SolverSettings};
use hostcap_core::{SnapshotRange, DEFAULT_FREQUENCY_HZ};
use hostcap_ts::WorstCaseConfig;
use serde::{Deserialize, Serialize};

/// Everything a reinforcement run depends on, passed explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementConfig {
    /// Reinforcement passes before the run is declared stalled
    pub max_iterations: usize,
    pub mode: AnalysisMode,
    /// Window of the time series to analyze, e.g. `"0..86400"`
    pub snapshots: SnapshotRange,
    pub limits: LimitConfig,
    pub system_frequency_hz: f64,
    pub solver: SolverSettings,
    pub worst_case: WorstCaseConfig,
}

impl Default for ReinforcementConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            mode: AnalysisMode::MvOnly,
            snapshots: SnapshotRange::all(),
            limits: LimitConfig::default(),
            system_frequency_hz: DEFAULT_FREQUENCY_HZ,
            solver: SolverSettings::default(),
            worst_case: WorstCaseConfig::default(),
        }
    }
}

/// Load a configuration file; the format follows the extension
/// (`.yaml`/`.yml`, `.json`, `.toml`), anything else is tried as YAML then JSON.
pub fn load_config_from_path(path: &Path) -> Result<ReinforcementConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading reinforcement config '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing reinforcement config yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing reinforcement config json")
        }
        Some(ext) if ext.eq_ignore_ascii_case("toml") => {
            toml::from_str(&data).context("parsing reinforcement config toml")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing reinforcement config"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_conservative() {
        let cfg = ReinforcementConfig::default();
        assert_eq!(cfg.max_iterations, 10);
        assert_eq!(cfg.mode, AnalysisMode::MvOnly);
        assert_eq!(cfg.limits.thermal_limit, 1.0);
        assert_eq!(cfg.system_frequency_hz, 50.0);
        assert!(cfg.snapshots.is_all());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "max_iterations: 3\nmode: lv\nsnapshots: \"3600..\"\nlimits:\n  lv_voltage_tolerance: 0.08"
        )
        .unwrap();
        let cfg = load_config_from_path(file.path()).unwrap();
        assert_eq!(cfg.max_iterations, 3);
        assert_eq!(cfg.snapshots, "3600..".parse::<SnapshotRange>().unwrap());
        assert_eq!(cfg.mode, AnalysisMode::LvOnly);
        assert_eq!(cfg.limits.lv_voltage_tolerance, 0.08);
        assert_eq!(cfg.limits.mv_voltage_tolerance, 0.10);
        assert_eq!(cfg.solver.max_iterations, 100);
    }

    #[test]
    fn toml_is_supported() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "mode = \"full\"\n\n[solver]\ntolerance = 1e-6").unwrap();
        let cfg = load_config_from_path(file.path()).unwrap();
        assert_eq!(cfg.mode, AnalysisMode::Full);
        assert_eq!(cfg.solver.tolerance, 1e-6);
    }

    #[test]
    fn invalid_mode_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{\"mode\": \"hv\"}}").unwrap();
        assert!(load_config_from_path(file.path()).is_err());
    }
}

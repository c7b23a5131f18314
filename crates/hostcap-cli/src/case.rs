//! Case files: one JSON document holding a topology and its catalog.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use hostcap_core::{EquipmentCatalog, Topology};
use hostcap_dist::{load_config_from_path, ReinforcementConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub topology: Topology,
    #[serde(default)]
    pub catalog: EquipmentCatalog,
}

impl Case {
    /// Read and validate a case. Validation warnings are logged; errors fail
    /// the load.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading case '{}'", path.display()))?;
        let mut case: Case = serde_json::from_str(&data)
            .with_context(|| format!("parsing case '{}'", path.display()))?;
        case.catalog.normalize();

        let diagnostics = case.topology.validate();
        for issue in diagnostics.warnings() {
            warn!(case = %path.display(), %issue, "topology check");
        }
        if diagnostics.has_errors() {
            let errors: Vec<String> = diagnostics.errors().map(|issue| issue.to_string()).collect();
            bail!(
                "case '{}' failed validation ({}): {}",
                path.display(),
                diagnostics.summary(),
                errors.join("; ")
            );
        }
        Ok(case)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory '{}'", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("serializing case")?;
        fs::write(path, json).with_context(|| format!("writing case '{}'", path.display()))
    }
}

/// Config from `path`, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ReinforcementConfig> {
    match path {
        Some(path) => load_config_from_path(path),
        None => Ok(ReinforcementConfig::default()),
    }
}

//! Unified error type for topology, catalog and translation failures.
//!
//! Domain crates keep their own error enums (solver, reinforcement) and wrap
//! [`GridError`] so a caller can match on the topology-level cause.

use thiserror::Error;

/// Errors raised while building, validating or translating a topology.
#[derive(Error, Debug)]
pub enum GridError {
    /// A line/transformer references a missing bus, or a required electrical
    /// parameter is unset and could not be defaulted.
    #[error("incomplete topology at {component}: {reason}")]
    IncompleteTopology { component: String, reason: String },

    /// No standard type exists for the requested voltage class or rating.
    #[error("missing catalog entry for {component}: {detail}")]
    MissingCatalogEntry { component: String, detail: String },

    /// Analysis mode outside the closed set `full`, `mv-only`, `lv-only`
    #[error("invalid analysis mode '{0}'; supported values: full, mv-only, lv-only")]
    InvalidAnalysisMode(String),

    /// Structural validation errors (duplicate IDs, wrong voltage level, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl GridError {
    pub fn incomplete(component: impl ToString, reason: impl Into<String>) -> Self {
        GridError::IncompleteTopology {
            component: component.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing_catalog(component: impl ToString, detail: impl Into<String>) -> Self {
        GridError::MissingCatalogEntry {
            component: component.to_string(),
            detail: detail.into(),
        }
    }
}

/// Convenience alias for results carrying a [`GridError`].
pub type GridResult<T> = Result<T, GridError>;

impl From<anyhow::Error> for GridError {
    fn from(err: anyhow::Error) -> Self {
        GridError::Other(err.to_string())
    }
}

impl From<String> for GridError {
    fn from(s: String) -> Self {
        GridError::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        GridError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}

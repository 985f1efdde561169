//! Error types for the schema resolver

use std::path::PathBuf;

use thiserror::Error;

/// Result type for resolver operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema resolver errors
///
/// Data-shape problems (bad version strings, malformed snapshots) never surface
/// here; they degrade to empty or default values. What remains are environment
/// failures the caller has to see.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid project config at {path}: {reason}")]
    ProjectConfig { path: PathBuf, reason: String },

    #[error("Cannot read snapshot directory {path}: {source}")]
    SnapshotDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

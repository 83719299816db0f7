//! Error types shared by the commitment pipeline

use std::path::PathBuf;

use crate::commitments::record::CommitmentStatus;

#[derive(Debug, thiserror::Error)]
pub enum CommitmentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error in {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to spawn {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Commitment script timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Commitment script exited with {code:?}: {stderr}")]
    ScriptFailed { code: Option<i32>, stderr: String },

    #[error("Commitment not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: CommitmentStatus,
        to: CommitmentStatus,
    },
}

pub type Result<T> = std::result::Result<T, CommitmentError>;

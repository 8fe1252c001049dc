//! Checkpoint error types.

use crate::core::ContextError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Serialization to JSON or binary format failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON or binary format failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Checkpoint version is not supported by this version
    #[error("Unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The machine is not at a stable state
    #[error("Cannot checkpoint while state '{state}' has an unfinished invoke")]
    NotStable { state: String },

    /// The stored path is not a walk of the chart
    #[error("Checkpoint path [{}] is invalid for this chart: {reason}", .path.join(" > "))]
    InvalidPath { path: Vec<String>, reason: String },

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("Checkpoint file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

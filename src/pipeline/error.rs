//! Session error types.

use super::workspace::WorkspaceError;
use crate::builder::BuildError;
use crate::chart::ChartError;
use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::engine::EngineError;
use thiserror::Error;

/// Errors crossing the session boundary.
///
/// Actor failures are not among them: they move the session to its failure
/// state and are read back through `current_error`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

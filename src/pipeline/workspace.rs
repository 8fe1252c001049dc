//! Sandboxed build environment consumed by the pipeline.
//!
//! Workspaces are external: a container runtime, a temp directory, or an
//! in-memory fake in tests. The pipeline only creates them from a
//! [`WorkspaceSpec`], writes files and asks for a diff.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Creation parameters of a workspace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSpec {
    pub base_image: String,
    /// Files placed in the workspace before setup, by path
    pub context: BTreeMap<String, String>,
    /// Commands run once after the context is in place
    pub setup_commands: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Failed to create workspace from {image}: {reason}")]
    Create { image: String, reason: String },

    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("{0}")]
    Diff(String),
}

/// Handle to one workspace.
#[async_trait]
pub trait Workspace: Send + Sync {
    async fn write_file(&mut self, path: &str, content: &str) -> Result<(), WorkspaceError>;

    /// Unified diff of the current tree against the tree it was created from.
    async fn diff(&self) -> Result<String, WorkspaceError>;

    /// Independent copy; writes to one are not visible in the other.
    fn clone_workspace(&self) -> Box<dyn Workspace>;
}

/// Creates workspaces.
#[async_trait]
pub trait WorkspaceFactory: Send + Sync {
    async fn create(&self, spec: WorkspaceSpec) -> Result<Box<dyn Workspace>, WorkspaceError>;
}

//! Engine and pipeline configuration.
//!
//! Both structs deserialize from TOML with every field optional; missing
//! fields take the defaults below.
//!
//! ```toml
//! truncate_threshold = 512
//! base_image = "oven/bun:1.2.5-alpine"
//!
//! [engine]
//! max_internal_transitions = 32
//! ```

use crate::pipeline::WorkspaceSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default bound on invoke-driven transitions within one `send`
pub const DEFAULT_MAX_INTERNAL_TRANSITIONS: usize = 64;

/// Default size above which review output replaces file content
pub const DEFAULT_TRUNCATE_THRESHOLD: usize = 256;

pub const DEFAULT_BASE_IMAGE: &str = "oven/bun:1.2.5-alpine";

pub const DEFAULT_DIFF_IMAGE: &str = "alpine/git";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings of the state machine engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Invoke-driven transitions allowed per `send` before the engine
    /// assumes a done/error cycle and stops.
    pub max_internal_transitions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_internal_transitions: DEFAULT_MAX_INTERNAL_TRANSITIONS,
        }
    }
}

impl EngineConfig {
    pub fn max_internal_transitions(mut self, limit: usize) -> Self {
        self.max_internal_transitions = limit;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_internal_transitions == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_internal_transitions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings of the generation pipeline session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub engine: EngineConfig,
    /// Files larger than this are truncated in review output
    pub truncate_threshold: usize,
    /// Image generation workspaces start from
    pub base_image: String,
    /// Commands run once when a generation workspace is created
    pub setup_commands: Vec<Vec<String>>,
    /// Image used to compute diffs against a client snapshot
    pub diff_image: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            truncate_threshold: DEFAULT_TRUNCATE_THRESHOLD,
            base_image: DEFAULT_BASE_IMAGE.to_string(),
            setup_commands: vec![vec!["bun".to_string(), "install".to_string()]],
            diff_image: DEFAULT_DIFF_IMAGE.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if self.base_image.trim().is_empty() {
            return Err(ConfigError::Invalid("base_image must not be empty".to_string()));
        }
        if self.diff_image.trim().is_empty() {
            return Err(ConfigError::Invalid("diff_image must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn truncate_threshold(mut self, bytes: usize) -> Self {
        self.truncate_threshold = bytes;
        self
    }

    pub fn base_image(mut self, image: impl Into<String>) -> Self {
        self.base_image = image.into();
        self
    }

    /// Workspace used by generation actors, seeded with `context` files.
    pub fn generation_workspace(&self, context: BTreeMap<String, String>) -> WorkspaceSpec {
        WorkspaceSpec {
            base_image: self.base_image.clone(),
            context,
            setup_commands: self.setup_commands.clone(),
        }
    }

    /// Workspace used to diff a client snapshot against session files.
    pub fn diff_workspace(&self, snapshot: BTreeMap<String, String>) -> WorkspaceSpec {
        WorkspaceSpec {
            base_image: self.diff_image.clone(),
            context: snapshot,
            setup_commands: Vec::new(),
        }
    }
}

//! Checkpoint and resume functionality for state machines.
//!
//! A checkpoint freezes a machine at a stable state: the active path from the
//! root's child down to the active leaf, the context as a plain mapping, and
//! the transition history. Actions and actors are not serializable and are
//! not stored; a checkpoint is restored against the same chart that produced
//! it, with state ids as the durable contract.

use crate::core::{ContextMap, StateHistory, StateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable checkpoint of state machine state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: Uuid,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    /// State ids from the root's child down to the active leaf
    pub active_path: Vec<StateId>,

    /// Context as a plain mapping
    pub context: ContextMap,

    /// Complete transition history
    #[serde(default)]
    pub history: StateHistory,
}

/// Binary layout: bincode cannot carry free-form JSON values, so the context
/// travels as a JSON string.
#[derive(Serialize, Deserialize)]
struct BinaryCheckpoint {
    version: u32,
    id: Uuid,
    timestamp: DateTime<Utc>,
    active_path: Vec<StateId>,
    context: String,
    history: StateHistory,
}

impl Checkpoint {
    pub fn new(active_path: Vec<StateId>, context: ContextMap, history: StateHistory) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            active_path,
            context,
            history,
        }
    }

    /// Id of the active leaf, `None` when the machine had not left the root.
    pub fn current_state_id(&self) -> Option<&StateId> {
        self.active_path.last()
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        checkpoint.check_version()
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        let context = serde_json::to_string(&self.context)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;
        let record = BinaryCheckpoint {
            version: self.version,
            id: self.id,
            timestamp: self.timestamp,
            active_path: self.active_path.clone(),
            context,
            history: self.history.clone(),
        };
        bincode::serialize(&record).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let record: BinaryCheckpoint = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        let context: ContextMap = serde_json::from_str(&record.context)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        Self {
            version: record.version,
            id: record.id,
            timestamp: record.timestamp,
            active_path: record.active_path,
            context,
            history: record.history,
        }
        .check_version()
    }

    /// Write atomically to `path`: to a temp file first, then rename.
    ///
    /// Paths ending in `.bin` get the binary format, everything else JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CheckpointError> {
        let path = path.as_ref();
        let bytes = if is_binary(path) {
            self.to_binary()?
        } else {
            self.to_json()?.into_bytes()
        };

        let temp_path = PathBuf::from(format!("{}.tmp", path.display()));
        fs::write(&temp_path, bytes).map_err(|source| CheckpointError::Io {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, path).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(checkpoint = %self.id, path = %path.display(), "Saved checkpoint");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let checkpoint = if is_binary(path) {
            Self::from_binary(&bytes)?
        } else {
            let json = String::from_utf8(bytes)
                .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
            Self::from_json(&json)?
        };

        debug!(checkpoint = %checkpoint.id, path = %path.display(), "Loaded checkpoint");
        Ok(checkpoint)
    }

    fn check_version(self) -> Result<Self, CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        Ok(self)
    }
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bin")
}

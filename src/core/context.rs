//! Task-scoped mutable data carried by a state machine.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Plain, key-ordered mapping a context serializes to.
pub type ContextMap = serde_json::Map<String, Value>;

/// Errors converting a context to or from its mapping form.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Context must serialize to a mapping, got {0}")]
    NotAMapping(&'static str),

    #[error("Context serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Context deserialization failed: {0}")]
    Deserialize(#[source] serde_json::Error),
}

/// Mutable data bag of one session.
///
/// The default codec goes through serde: `dump` must produce a JSON object and
/// `load` must accept whatever `dump` produced. Types with a custom layout
/// override both methods.
///
/// # Example
///
/// ```rust
/// use waypoint::core::Context;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Counter {
///     hits: u32,
/// }
///
/// impl Context for Counter {}
///
/// let map = Counter { hits: 3 }.dump().unwrap();
/// assert_eq!(Counter::load(map).unwrap(), Counter { hits: 3 });
/// ```
pub trait Context: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn dump(&self) -> Result<ContextMap, ContextError> {
        match serde_json::to_value(self).map_err(ContextError::Serialize)? {
            Value::Object(map) => Ok(map),
            other => Err(ContextError::NotAMapping(kind_of(&other))),
        }
    }

    fn load(map: ContextMap) -> Result<Self, ContextError> {
        serde_json::from_value(Value::Object(map)).map_err(ContextError::Deserialize)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

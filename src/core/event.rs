//! Events that drive transitions.
//!
//! An event is compared only by its tag. Transition tables are keyed by
//! [`EventTag`], and every event reduces to one before lookup, so a bare
//! `&str` tag finds the same transition as a full event with a payload.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display};

/// A signal with a type tag.
pub trait Event: Send + Sync {
    /// The discriminating tag used for transition lookup.
    fn tag(&self) -> &str;

    /// Normalized comparison key.
    fn key(&self) -> EventTag {
        EventTag::new(self.tag())
    }
}

/// Comparison key of an event.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTag(String);

impl EventTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EventTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventTag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for EventTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl Event for EventTag {
    fn tag(&self) -> &str {
        &self.0
    }
}

impl Event for &str {
    fn tag(&self) -> &str {
        self
    }
}

impl Event for String {
    fn tag(&self) -> &str {
        self
    }
}

/// General-purpose event: a tag with an optional JSON payload.
///
/// Equality ignores the payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signal {
    pub tag: EventTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Signal {
    pub fn new(tag: impl Into<EventTag>) -> Self {
        Self {
            tag: tag.into(),
            payload: None,
        }
    }

    pub fn with_payload(tag: impl Into<EventTag>, payload: serde_json::Value) -> Self {
        Self {
            tag: tag.into(),
            payload: Some(payload),
        }
    }
}

impl Event for Signal {
    fn tag(&self) -> &str {
        self.tag.as_str()
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl Eq for Signal {}

impl PartialEq<str> for Signal {
    fn eq(&self, other: &str) -> bool {
        self.tag.as_str() == other
    }
}

impl PartialEq<&str> for Signal {
    fn eq(&self, other: &&str) -> bool {
        self.tag.as_str() == *other
    }
}

//! State identifiers for the state chart.
//!
//! Charts address their states by [`StateId`], a plain string that doubles as
//! the durable contract stored in checkpoints. Applications that prefer typed
//! states implement [`State`] on an enum (usually through
//! [`state_enum!`](crate::state_enum)) and convert to ids at the chart boundary.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Debug, Display};

/// Trait for typed state enums.
///
/// All methods are pure. The name returned by [`State::name`] is the id the
/// state carries inside a chart, so it must stay stable across releases for
/// checkpoints to remain restorable.
///
/// # Example
///
/// ```rust
/// use waypoint::core::State;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum TaskState {
///     Pending,
///     Running,
///     Complete,
///     Failed,
/// }
///
/// impl State for TaskState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Pending => "pending",
///             Self::Running => "running",
///             Self::Complete => "complete",
///             Self::Failed => "failed",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Complete | Self::Failed)
///     }
///
///     fn is_error(&self) -> bool {
///         matches!(self, Self::Failed)
///     }
/// }
/// ```
pub trait State: Clone + PartialEq + Debug + Send + Sync {
    /// Get the state's chart id.
    fn name(&self) -> &str;

    /// Check if this is a final (absorbing) state.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }

    /// Check if this is an error state.
    ///
    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }
}

/// Identifier of one state in a chart.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(String);

impl StateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of a typed state.
    pub fn of<S: State>(state: &S) -> Self {
        Self(state.name().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for StateId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&StateId> for StateId {
    fn from(id: &StateId) -> Self {
        id.clone()
    }
}

impl PartialEq<str> for StateId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StateId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

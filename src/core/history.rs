//! State transition history tracking.
//!
//! Records every change of the active state, external or internal, so a
//! restored session still knows how it reached its review gate.

use super::event::EventTag;
use super::state::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What caused a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// An externally sent event.
    Event(EventTag),
    /// An invoke finished successfully.
    Done,
    /// An invoke failed.
    Error,
}

/// Record of a single state transition.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{StateId, StateTransition, Trigger};
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     from: None,
///     to: StateId::from("draft"),
///     timestamp: Utc::now(),
///     trigger: Trigger::Event("CONFIRM".into()),
/// };
/// assert!(transition.from.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state being left; `None` when leaving the root
    pub from: Option<StateId>,
    /// The state being entered
    pub to: StateId,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
    /// What caused it
    pub trigger: Trigger,
}

/// Ordered history of state transitions.
///
/// History is immutable - the `record` method returns a new history
/// with the transition added.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{StateHistory, StateId, StateTransition, Trigger};
/// use chrono::Utc;
///
/// let history = StateHistory::new()
///     .record(StateTransition {
///         from: None,
///         to: StateId::from("draft"),
///         timestamp: Utc::now(),
///         trigger: Trigger::Event("CONFIRM".into()),
///     })
///     .record(StateTransition {
///         from: Some(StateId::from("draft")),
///         to: StateId::from("review_draft"),
///         timestamp: Utc::now(),
///         trigger: Trigger::Done,
///     });
///
/// let path = history.get_path();
/// assert_eq!(path.len(), 2);
/// assert_eq!(path[1], &StateId::from("review_draft"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateHistory {
    transitions: Vec<StateTransition>,
}

impl StateHistory {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// This does not mutate the existing history.
    pub fn record(&self, transition: StateTransition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Get the path of states traversed.
    ///
    /// Starts with the `from` state of the first transition when there is one
    /// (the root has no id and is skipped), then the `to` state of each
    /// transition.
    pub fn get_path(&self) -> Vec<&StateId> {
        let mut path = Vec::new();
        if let Some(from) = self.transitions.first().and_then(|t| t.from.as_ref()) {
            path.push(from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Calculate total duration from first to last transition.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Number of times a state was entered.
    pub fn visits(&self, state: &str) -> usize {
        self.transitions.iter().filter(|t| t.to == *state).count()
    }

    /// Get all transitions.
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }
}

//! Engine error types.

use thiserror::Error;

/// Errors returned while driving a state machine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Neither the active state nor any ancestor handles the event
    #[error("No transition for event '{event}' from state '{state}'")]
    NoMatchingTransition { event: String, state: String },

    /// No state on the active chain has a child with the target id
    #[error("Target '{target}' is not reachable from state '{state}'")]
    UnknownTarget { state: String, target: String },

    #[error("Invoke of state '{state}' was interrupted. Call resume_interrupted() first")]
    Interrupted { state: String },

    #[error("No interrupted invoke to resume")]
    NotInterrupted,

    /// Done/error transitions kept entering invoking states
    #[error("Exceeded {limit} internal transitions, stopped at state '{state}'")]
    TransitionLimit { limit: usize, state: String },
}

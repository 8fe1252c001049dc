//! Build errors for invoke bindings.

use thiserror::Error;

/// Errors that can occur when building an invoke binding.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Invoke of actor '{actor}' has no done target. Call .on_done(state)")]
    MissingDoneTarget { actor: String },

    #[error("Invoke of actor '{actor}' has no error target. Call .on_error(state)")]
    MissingErrorTarget { actor: String },
}

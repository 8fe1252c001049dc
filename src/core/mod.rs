//! Core value types shared by the chart, the engine and checkpoints.
//!
//! - State ids and the `State` trait for typed state enums
//! - Events and their tag-only comparison key
//! - The `Context` trait and its mapping codec
//! - Immutable transition history

mod context;
mod event;
mod history;
mod state;

pub use context::{Context, ContextError, ContextMap};
pub use event::{Event, EventTag, Signal};
pub use history::{StateHistory, StateTransition, Trigger};
pub use state::{State, StateId};

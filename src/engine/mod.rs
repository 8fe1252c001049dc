//! Statechart execution.
//!
//! # Key Concepts
//!
//! - **Resolution**: an event is looked up on the active leaf first, then on
//!   each ancestor; the first match wins. Lookup stops after a final state.
//! - **Invokes**: entering a state with an invoke runs its actor, applies the
//!   `on_done` or `on_error` actions and moves on, until a state without an
//!   invoke is reached.
//! - **Checkpoints**: a stable machine can be frozen into a
//!   [`Checkpoint`](crate::checkpoint::Checkpoint) and restored later against
//!   the same chart without re-running any actor.

mod error;
mod machine;

pub use error::EngineError;
pub use machine::StateMachine;

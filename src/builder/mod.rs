//! Builder API for state charts.
//!
//! [`StateBuilder`] describes the state tree declaratively, [`InvokeBuilder`]
//! binds an actor to a state, and [`state_enum!`](crate::state_enum) generates
//! typed state ids.

pub mod error;
pub mod invoke;
pub mod macros;
pub mod state;

pub use error::BuildError;
pub use invoke::InvokeBuilder;
pub use state::StateBuilder;

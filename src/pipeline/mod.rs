//! Human-reviewable code generation pipeline.
//!
//! The pipeline drafts an application, lets a reviewer confirm or send
//! feedback, generates backend handlers and frontend concurrently, and
//! applies late feedback as an edit. Each generation stage is an actor bound
//! to a chart state; the [`Session`] wraps the engine with the operations a
//! driver (CLI, HTTP server) needs.

mod actors;
mod chart;
mod error;
mod session;
mod states;
mod workspace;

pub use actors::{ApplicationInput, EditInput, PipelineActors};
pub use chart::{build_chart, PipelineChart};
pub use error::SessionError;
pub use session::{PendingAction, Session, StateOutput, TRUNCATED_PLACEHOLDER};
pub use states::{PipelineContext, PipelineEvent, PipelineState};
pub use workspace::{Workspace, WorkspaceError, WorkspaceFactory, WorkspaceSpec};

//! Waypoint: a statechart runtime for human-reviewable generation pipelines
//!
//! Waypoint models a multi-stage generation workflow as a hierarchical state
//! machine. Leaf states invoke long-running asynchronous actors; review gates
//! wait for a human to confirm or send feedback, and a session can be
//! checkpointed at any gate and resumed in a fresh process.
//!
//! # Core Concepts
//!
//! - **Chart**: immutable state tree built with [`builder::StateBuilder`]
//! - **Engine**: [`engine::StateMachine`] resolves events leaf-first and runs
//!   invokes until a stable state is reached
//! - **Actors**: async components bound to states, composable with
//!   [`actor::ConcurrentActor`]
//! - **Trajectories**: branching step records replayed into file sets with
//!   last-writer-wins and deletion tombstones
//! - **Checkpoints**: JSON or binary snapshots of a stable machine
//!
//! # Example
//!
//! ```rust
//! use waypoint::actor::{actor_fn, ActorError, ActorOutput};
//! use waypoint::builder::{InvokeBuilder, StateBuilder};
//! use waypoint::core::{Context, Signal};
//! use waypoint::engine::StateMachine;
//! use waypoint::trajectory::{aggregate_output, FileChange, FileChanges, Solution};
//! use serde::{Deserialize, Serialize};
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Ctx {
//!     prompt: String,
//!     files: BTreeMap<String, String>,
//! }
//!
//! impl Context for Ctx {}
//!
//! # tokio_test();
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn tokio_test() {
//! let draft = actor_fn("draft", |prompt: String| async move {
//!     let files = FileChanges::from([("notes.md".to_string(), FileChange::Write(prompt))]);
//!     Ok::<_, ActorError>(Solution::from_changes(files).into())
//! });
//!
//! let invoke = InvokeBuilder::new(draft, |ctx: &Ctx| ctx.prompt.clone())
//!     .on_done("review")
//!     .done_action(|ctx: &mut Ctx, output: &ActorOutput| aggregate_output(output).apply_to(&mut ctx.files))
//!     .on_error("failed")
//!     .build()
//!     .unwrap();
//!
//! let chart = StateBuilder::root()
//!     .on("START", "drafting")
//!     .child(StateBuilder::new("drafting").invoke(invoke))
//!     .child(StateBuilder::new("review").on("APPROVE", "done"))
//!     .child(StateBuilder::new("done").final_state())
//!     .child(StateBuilder::new("failed").final_state())
//!     .build()
//!     .unwrap();
//!
//! let ctx = Ctx { prompt: "hello".to_string(), ..Ctx::default() };
//! let mut machine = StateMachine::<Ctx, Signal>::start(Arc::new(chart), ctx);
//! let state = machine.send(Signal::new("START")).await.unwrap();
//!
//! assert_eq!(state, "review");
//! assert_eq!(machine.context().files["notes.md"], "hello");
//! # }
//! ```

pub mod actor;
pub mod builder;
pub mod chart;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod engine;
pub mod pipeline;
pub mod trajectory;

// Re-export commonly used types
pub use checkpoint::{Checkpoint, CheckpointError};
pub use config::{EngineConfig, PipelineConfig};
pub use core::{Context, Event, State, StateHistory, StateId};
pub use engine::{EngineError, StateMachine};

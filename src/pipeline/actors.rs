//! Actor inputs and the actions folding actor results into the context.

use super::states::{PipelineContext, PipelineEvent};
use crate::actor::{Actor, ActorError, ActorOutput, ConcurrentActor};
use crate::trajectory::aggregate_output;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Input of the application stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationInput {
    pub user_prompt: String,
    pub files: BTreeMap<String, String>,
    pub feedback: Option<String>,
}

/// Input of the feedback edit stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditInput {
    pub files: BTreeMap<String, String>,
    pub user_prompt: String,
    pub feedback: Option<String>,
}

/// The actors a pipeline chart binds.
///
/// The draft actor receives the feedback text when there is one, otherwise
/// the user prompt.
#[derive(Clone)]
pub struct PipelineActors {
    pub(crate) draft: Arc<dyn Actor<Input = String>>,
    pub(crate) application: Arc<dyn Actor<Input = ApplicationInput>>,
    pub(crate) edit: Arc<dyn Actor<Input = EditInput>>,
}

impl PipelineActors {
    /// Bind the stage actors. `handlers` and `frontend` run concurrently in
    /// the application stage.
    pub fn new<D, H, F, Ed>(draft: D, handlers: H, frontend: F, edit: Ed) -> Self
    where
        D: Actor<Input = String> + 'static,
        H: Actor<Input = ApplicationInput> + 'static,
        F: Actor<Input = ApplicationInput> + 'static,
        Ed: Actor<Input = EditInput> + 'static,
    {
        let application = ConcurrentActor::new()
            .with("handlers", handlers)
            .with("frontend", frontend);
        Self {
            draft: Arc::new(draft),
            application: Arc::new(application),
            edit: Arc::new(edit),
        }
    }

    /// Replace the application stage actor.
    pub fn with_application<A>(mut self, application: A) -> Self
    where
        A: Actor<Input = ApplicationInput> + 'static,
    {
        self.application = Arc::new(application);
        self
    }
}

pub(crate) fn draft_input(ctx: &PipelineContext) -> String {
    ctx.feedback_data
        .clone()
        .unwrap_or_else(|| ctx.user_prompt.clone())
}

pub(crate) fn application_input(ctx: &PipelineContext) -> ApplicationInput {
    ApplicationInput {
        user_prompt: ctx.user_prompt.clone(),
        files: ctx.files.clone(),
        feedback: ctx.feedback_data.clone(),
    }
}

pub(crate) fn edit_input(ctx: &PipelineContext) -> EditInput {
    EditInput {
        files: ctx.files.clone(),
        user_prompt: ctx.user_prompt.clone(),
        feedback: ctx.feedback_data.clone(),
    }
}

/// Merge an actor result into the context's file set.
pub(crate) fn update_files(ctx: &mut PipelineContext, output: &ActorOutput) {
    let aggregation = aggregate_output(output);
    info!(
        written = aggregation.files.len(),
        deleted = aggregation.deleted.len(),
        "Updating context files from result"
    );
    if !aggregation.conflicts.is_empty() {
        warn!(
            conflicts = aggregation.conflicts.len(),
            "Concurrent branches wrote overlapping paths"
        );
    }
    aggregation.apply_to(&mut ctx.files);
}

pub(crate) fn set_error(ctx: &mut PipelineContext, error: &ActorError) {
    warn!(error = %error, "Setting error in context");
    ctx.error = Some(error.to_string());
}

pub(crate) fn store_feedback(ctx: &mut PipelineContext, event: &PipelineEvent) {
    if let Some(text) = event.feedback() {
        ctx.feedback_data = Some(text.to_string());
    }
}

//! The pipeline's state chart.

use super::actors::{
    application_input, draft_input, edit_input, set_error, store_feedback, update_files,
    PipelineActors,
};
use super::error::SessionError;
use super::states::{PipelineContext, PipelineEvent, PipelineState};
use crate::builder::{InvokeBuilder, StateBuilder};
use crate::chart::StateChart;

/// Chart type driving a session.
pub type PipelineChart = StateChart<PipelineContext, PipelineEvent>;

/// Build the generation pipeline.
///
/// ```text
/// draft              --done-->     review_draft
/// review_draft       --CONFIRM-->  application
/// review_draft       --FEEDBACK--> draft
/// application        --done-->     review_application
/// review_application --CONFIRM-->  complete
/// review_application --FEEDBACK--> apply_feedback
/// apply_feedback     --done-->     complete
/// ```
///
/// Every invoke failure leads to `failure`. The root handles `CONFIRM`
/// (start drafting) and `FEEDBACK` (edit directly). `complete` and `failure`
/// are final and accept no events.
pub fn build_chart(actors: PipelineActors) -> Result<PipelineChart, SessionError> {
    let PipelineActors {
        draft,
        application,
        edit,
    } = actors;

    let draft = InvokeBuilder::new(draft, draft_input)
        .on_done(PipelineState::ReviewDraft)
        .done_action(update_files)
        .on_error(PipelineState::Failure)
        .error_action(set_error)
        .build()?;

    let application = InvokeBuilder::new(application, application_input)
        .on_done(PipelineState::ReviewApplication)
        .done_action(update_files)
        .on_error(PipelineState::Failure)
        .error_action(set_error)
        .build()?;

    let edit = InvokeBuilder::new(edit, edit_input)
        .on_done(PipelineState::Complete)
        .done_action(update_files)
        .on_error(PipelineState::Failure)
        .error_action(set_error)
        .build()?;

    let chart = StateBuilder::root()
        .on(PipelineEvent::CONFIRM, PipelineState::Draft)
        .on_with(
            PipelineEvent::FEEDBACK,
            PipelineState::ApplyFeedback,
            store_feedback,
        )
        .child(StateBuilder::new(PipelineState::Draft).invoke(draft))
        .child(
            StateBuilder::new(PipelineState::ReviewDraft)
                .on(PipelineEvent::CONFIRM, PipelineState::Application)
                .on_with(PipelineEvent::FEEDBACK, PipelineState::Draft, store_feedback),
        )
        .child(StateBuilder::new(PipelineState::Application).invoke(application))
        .child(
            StateBuilder::new(PipelineState::ReviewApplication)
                .on(PipelineEvent::CONFIRM, PipelineState::Complete)
                .on_with(
                    PipelineEvent::FEEDBACK,
                    PipelineState::ApplyFeedback,
                    store_feedback,
                ),
        )
        .child(StateBuilder::new(PipelineState::ApplyFeedback).invoke(edit))
        .child(StateBuilder::new(PipelineState::Complete).final_state())
        .child(StateBuilder::new(PipelineState::Failure).final_state())
        .build()?;

    Ok(chart)
}

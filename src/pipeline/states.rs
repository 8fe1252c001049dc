//! States, events and context of the generation pipeline.

use crate::core::{Context, Event};
use crate::state_enum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

state_enum! {
    /// Stages of the generation pipeline, labelled with their chart ids.
    pub enum PipelineState {
        Draft = "draft",
        ReviewDraft = "review_draft",
        Application = "application",
        ReviewApplication = "review_application",
        ApplyFeedback = "apply_feedback",
        Complete = "complete",
        Failure = "failure",
    }
    final: [Complete, Failure]
    error: [Failure]
}

impl PipelineState {
    /// Gates waiting for a human to confirm or give feedback.
    pub fn is_review(self) -> bool {
        matches!(self, Self::ReviewDraft | Self::ReviewApplication)
    }
}

/// Driver input to the pipeline.
///
/// Events compare by tag only; the feedback text is payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PipelineEvent {
    Confirm,
    Feedback(String),
}

impl PipelineEvent {
    pub const CONFIRM: &'static str = "CONFIRM";
    pub const FEEDBACK: &'static str = "FEEDBACK";

    pub fn feedback(&self) -> Option<&str> {
        match self {
            Self::Confirm => None,
            Self::Feedback(text) => Some(text),
        }
    }
}

impl Event for PipelineEvent {
    fn tag(&self) -> &str {
        match self {
            Self::Confirm => Self::CONFIRM,
            Self::Feedback(_) => Self::FEEDBACK,
        }
    }
}

impl PartialEq for PipelineEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tag() == other.tag()
    }
}

impl Eq for PipelineEvent {}

impl PartialEq<str> for PipelineEvent {
    fn eq(&self, other: &str) -> bool {
        self.tag() == other
    }
}

impl PartialEq<&str> for PipelineEvent {
    fn eq(&self, other: &&str) -> bool {
        self.tag() == *other
    }
}

/// Data carried through one generation session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineContext {
    pub user_prompt: String,
    /// Latest feedback from the driver
    #[serde(default)]
    pub feedback_data: Option<String>,
    /// Materialized artifact set
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PipelineContext {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            ..Self::default()
        }
    }
}

impl Context for PipelineContext {}

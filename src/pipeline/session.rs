//! Driver-facing session over the pipeline chart.

use super::actors::PipelineActors;
use super::chart::build_chart;
use super::error::SessionError;
use super::states::{PipelineContext, PipelineEvent, PipelineState};
use super::workspace::WorkspaceFactory;
use crate::checkpoint::Checkpoint;
use crate::config::PipelineConfig;
use crate::core::{StateHistory, StateId};
use crate::engine::StateMachine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Placeholder for file contents over the truncation threshold.
pub const TRUNCATED_PLACEHOLDER: &str = "large file truncated";

/// Driver actions valid in the current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    Confirm,
    Feedback,
    Complete,
    GetError,
    Wait,
}

impl PendingAction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Feedback => "feedback",
            Self::Complete => "complete",
            Self::GetError => "get_error",
            Self::Wait => "wait",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Confirm => "Accept current output and continue",
            Self::Feedback => "Submit feedback for the current output and trigger revision",
            Self::Complete => "Finalize and get all artifacts",
            Self::GetError => "Get error details",
            Self::Wait => "Wait for processing to complete",
        }
    }
}

/// What the current state has to show a reviewer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateOutput {
    Draft(BTreeMap<String, String>),
    Application(BTreeMap<String, String>),
    Error(String),
    Processing,
}

/// One generation session.
///
/// ```rust,no_run
/// # async fn run(actors: waypoint::pipeline::PipelineActors) -> Result<(), waypoint::pipeline::SessionError> {
/// use waypoint::config::PipelineConfig;
/// use waypoint::pipeline::Session;
///
/// let mut session = Session::start(actors, "Minimal persistent counter application", PipelineConfig::default()).await?;
/// session.run_to_completion().await?;
///
/// if let Some(error) = session.current_error() {
///     eprintln!("generation failed: {error}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session {
    machine: StateMachine<PipelineContext, PipelineEvent>,
    config: PipelineConfig,
}

impl Session {
    /// Build the chart and run the draft stage right away.
    pub async fn start(
        actors: PipelineActors,
        user_prompt: impl Into<String>,
        config: PipelineConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let chart = Arc::new(build_chart(actors)?);
        let machine = StateMachine::start(chart, PipelineContext::new(user_prompt))
            .with_config(config.engine.clone());

        let mut session = Self { machine, config };
        info!("Starting generation session");
        session.confirm().await?;
        Ok(session)
    }

    /// Resume a session from a checkpoint. The actors must be equivalent to
    /// the ones the checkpointed session ran with.
    pub fn restore(
        actors: PipelineActors,
        checkpoint: Checkpoint,
        config: PipelineConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let chart = Arc::new(build_chart(actors)?);
        let machine = StateMachine::restore(chart, checkpoint)?.with_config(config.engine.clone());
        Ok(Self { machine, config })
    }

    pub fn checkpoint(&self) -> Result<Checkpoint, SessionError> {
        Ok(self.machine.checkpoint()?)
    }

    pub async fn confirm(&mut self) -> Result<StateId, SessionError> {
        Ok(self.machine.send(PipelineEvent::Confirm).await?)
    }

    pub async fn submit_feedback(&mut self, feedback: impl Into<String>) -> Result<StateId, SessionError> {
        Ok(self
            .machine
            .send(PipelineEvent::Feedback(feedback.into()))
            .await?)
    }

    /// Confirm every gate until the session completes or fails.
    pub async fn run_to_completion(&mut self) -> Result<(), SessionError> {
        while !self.is_complete() {
            self.confirm().await?;
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        matches!(
            self.current_state(),
            Some(PipelineState::Complete | PipelineState::Failure)
        )
    }

    pub fn current_error(&self) -> Option<&str> {
        self.machine.context().error.as_deref()
    }

    /// Id of the active state, empty before the first transition.
    pub fn current_state_id(&self) -> &str {
        self.machine.current_state_id().map_or("", StateId::as_str)
    }

    pub fn current_state(&self) -> Option<PipelineState> {
        PipelineState::from_name(self.current_state_id())
    }

    pub fn pending_actions(&self) -> Vec<PendingAction> {
        let actions = match self.current_state() {
            Some(PipelineState::ReviewDraft | PipelineState::ReviewApplication) => {
                vec![PendingAction::Confirm, PendingAction::Feedback]
            }
            // complete is final; feedback no longer resolves
            Some(PipelineState::Complete) => vec![PendingAction::Complete],
            Some(PipelineState::Failure) => vec![PendingAction::GetError],
            _ => vec![PendingAction::Wait],
        };
        debug!(state = self.current_state_id(), ?actions, "Pending actions");
        actions
    }

    pub fn state_output(&self) -> StateOutput {
        let context = self.machine.context();
        match self.current_state() {
            Some(PipelineState::ReviewDraft) => StateOutput::Draft(context.files.clone()),
            Some(PipelineState::ReviewApplication) => StateOutput::Application(self.truncated_files()),
            Some(PipelineState::Complete) => StateOutput::Application(context.files.clone()),
            Some(PipelineState::Failure) => StateOutput::Error(
                context
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
            _ => StateOutput::Processing,
        }
    }

    /// Files with contents over the configured threshold replaced by a
    /// placeholder.
    pub fn truncated_files(&self) -> BTreeMap<String, String> {
        let threshold = self.config.truncate_threshold;
        self.files()
            .iter()
            .map(|(path, content)| {
                let shown = if content.len() > threshold {
                    TRUNCATED_PLACEHOLDER.to_string()
                } else {
                    content.clone()
                };
                (path.clone(), shown)
            })
            .collect()
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.machine.context().files
    }

    pub fn context(&self) -> &PipelineContext {
        self.machine.context()
    }

    pub fn history(&self) -> &StateHistory {
        self.machine.history()
    }

    /// Diff the session's files against a client snapshot.
    ///
    /// A diff workspace is created from the snapshot, every session file is
    /// written over it, and the workspace diff is returned. Write failures
    /// are logged and skipped; a failing diff is reported in the returned
    /// text.
    pub async fn diff_with(
        &self,
        snapshot: BTreeMap<String, String>,
        factory: &dyn WorkspaceFactory,
    ) -> Result<String, SessionError> {
        info!(snapshot_files = snapshot.len(), "Generating diff against snapshot");
        let mut workspace = factory.create(self.config.diff_workspace(snapshot)).await?;

        for (path, content) in self.files() {
            if let Err(error) = workspace.write_file(path, content).await {
                warn!(path = %path, error = %error, "Failed to write session file for diff");
            }
        }

        match workspace.diff().await {
            Ok(diff) => {
                if diff.is_empty() {
                    warn!("Diff output is empty");
                }
                Ok(diff)
            }
            Err(error) => {
                warn!(error = %error, "Diff generation failed");
                Ok(format!("# ERROR GENERATING DIFF: {error}"))
            }
        }
    }

    /// Stages the session goes through, for display to the user.
    pub fn execution_plan() -> &'static str {
        "1. Application draft. Contains types, database tables and handler declarations only.\n\
         2. Core backend implementations and application frontend.\n\
         \n\
         The result application will be based on Typescript, Drizzle, tRPC and React. \
         The list of available libraries is limited but sufficient to build CRUD apps."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{actor_fn, Actor, ActorError, ActorOutput};
    use crate::engine::EngineError;
    use crate::pipeline::{ApplicationInput, EditInput, Workspace, WorkspaceError, WorkspaceSpec};
    use crate::trajectory::{FileChange, FileChanges, Solution};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn writes(files: &[(&str, &str)]) -> ActorOutput {
        let changes: FileChanges = files
            .iter()
            .map(|(path, content)| (path.to_string(), FileChange::Write(content.to_string())))
            .collect();
        Solution::from_changes(changes).into()
    }

    fn succeeding<I: Send + 'static>(name: &str, files: &[(&str, &str)]) -> impl Actor<Input = I> {
        let output = writes(files);
        actor_fn(name, move |_: I| {
            let output = output.clone();
            async move { Ok::<_, ActorError>(output) }
        })
    }

    fn actors(large: &str) -> PipelineActors {
        PipelineActors::new(
            succeeding::<String>("draft", &[("schema.ts", "export type Counter = {}")]),
            succeeding::<ApplicationInput>("handlers", &[("handlers.ts", "export {}")]),
            succeeding::<ApplicationInput>("frontend", &[("App.tsx", large)]),
            succeeding::<EditInput>("edit", &[("App.tsx", "edited")]),
        )
    }

    #[tokio::test]
    async fn start_runs_draft_and_waits_for_review() {
        let session = Session::start(actors("<App />"), "counter", PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(session.current_state_id(), "review_draft");
        assert_eq!(
            session.pending_actions(),
            vec![PendingAction::Confirm, PendingAction::Feedback]
        );
        assert!(matches!(session.state_output(), StateOutput::Draft(files) if files.contains_key("schema.ts")));
        assert!(!session.is_complete());
    }

    #[tokio::test]
    async fn review_output_truncates_large_files() {
        let large = "x".repeat(300);
        let mut session = Session::start(actors(&large), "counter", PipelineConfig::default())
            .await
            .unwrap();
        session.confirm().await.unwrap();

        assert_eq!(session.current_state(), Some(PipelineState::ReviewApplication));
        let StateOutput::Application(files) = session.state_output() else {
            panic!("expected application output");
        };
        assert_eq!(files["App.tsx"], TRUNCATED_PLACEHOLDER);
        assert_eq!(files["handlers.ts"], "export {}");

        session.confirm().await.unwrap();
        assert_eq!(session.state_output(), StateOutput::Application(session.files().clone()));
        assert_eq!(session.files()["App.tsx"], large);
        assert_eq!(session.pending_actions(), vec![PendingAction::Complete]);
    }

    #[tokio::test]
    async fn feedback_after_completion_is_rejected() {
        let mut session = Session::start(actors("<App />"), "counter", PipelineConfig::default())
            .await
            .unwrap();
        session.run_to_completion().await.unwrap();

        let result = session.submit_feedback("one more tweak").await;

        assert!(matches!(
            result,
            Err(SessionError::Engine(EngineError::NoMatchingTransition { .. }))
        ));
        assert_eq!(session.current_state(), Some(PipelineState::Complete));
        assert_eq!(session.files()["App.tsx"], "<App />");
        assert_eq!(session.context().feedback_data, None);
    }

    #[tokio::test]
    async fn truncation_threshold_comes_from_config() {
        let config = PipelineConfig::default().truncate_threshold(4);
        let mut session = Session::start(actors("<App />"), "counter", config).await.unwrap();
        session.confirm().await.unwrap();

        let files = session.truncated_files();
        assert_eq!(files["App.tsx"], TRUNCATED_PLACEHOLDER);
    }

    #[tokio::test]
    async fn failure_exposes_error() {
        let failing = PipelineActors::new(
            actor_fn("draft", |_: String| async move {
                Err::<ActorOutput, _>(ActorError::failed("model unavailable"))
            }),
            succeeding::<ApplicationInput>("handlers", &[]),
            succeeding::<ApplicationInput>("frontend", &[]),
            succeeding::<EditInput>("edit", &[]),
        );
        let session = Session::start(failing, "counter", PipelineConfig::default())
            .await
            .unwrap();

        assert!(session.is_complete());
        assert_eq!(session.current_error(), Some("model unavailable"));
        assert_eq!(session.pending_actions(), vec![PendingAction::GetError]);
        assert_eq!(
            session.state_output(),
            StateOutput::Error("model unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn run_to_completion_confirms_every_gate() {
        let mut session = Session::start(actors("<App />"), "counter", PipelineConfig::default())
            .await
            .unwrap();
        session.run_to_completion().await.unwrap();

        assert_eq!(session.current_state(), Some(PipelineState::Complete));
        assert!(session.current_error().is_none());
        assert_eq!(session.history().get_path().len(), 5);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = PipelineConfig::default().base_image("  ");
        let result = Session::start(actors("<App />"), "counter", config).await;
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn actions_have_descriptions() {
        assert_eq!(PendingAction::GetError.name(), "get_error");
        assert_eq!(PendingAction::Wait.description(), "Wait for processing to complete");
        assert_eq!(
            serde_json::to_string(&PendingAction::GetError).unwrap(),
            "\"get_error\""
        );
        assert!(Session::execution_plan().starts_with("1. Application draft"));
    }

    #[derive(Default)]
    struct Recorder {
        specs: Mutex<Vec<WorkspaceSpec>>,
        fail_diff: bool,
    }

    struct RecordedWorkspace {
        base: BTreeMap<String, String>,
        files: BTreeMap<String, String>,
        fail_diff: bool,
    }

    #[async_trait]
    impl Workspace for RecordedWorkspace {
        async fn write_file(&mut self, path: &str, content: &str) -> Result<(), WorkspaceError> {
            self.files.insert(path.to_string(), content.to_string());
            Ok(())
        }

        async fn diff(&self) -> Result<String, WorkspaceError> {
            if self.fail_diff {
                return Err(WorkspaceError::Diff("git exited with 128".to_string()));
            }
            Ok(self
                .files
                .iter()
                .filter(|(path, content)| self.base.get(*path) != Some(*content))
                .map(|(path, _)| format!("M {path}\n"))
                .collect())
        }

        fn clone_workspace(&self) -> Box<dyn Workspace> {
            Box::new(RecordedWorkspace {
                base: self.base.clone(),
                files: self.files.clone(),
                fail_diff: self.fail_diff,
            })
        }
    }

    #[async_trait]
    impl WorkspaceFactory for Recorder {
        async fn create(&self, spec: WorkspaceSpec) -> Result<Box<dyn Workspace>, WorkspaceError> {
            self.specs.lock().unwrap().push(spec.clone());
            Ok(Box::new(RecordedWorkspace {
                base: spec.context.clone(),
                files: spec.context,
                fail_diff: self.fail_diff,
            }))
        }
    }

    #[tokio::test]
    async fn diff_overlays_session_files_on_snapshot() {
        let session = Session::start(actors("<App />"), "counter", PipelineConfig::default())
            .await
            .unwrap();
        let factory = Recorder::default();
        let snapshot = BTreeMap::from([
            ("schema.ts".to_string(), "old".to_string()),
            ("README.md".to_string(), "hello".to_string()),
        ]);

        let diff = session.diff_with(snapshot, &factory).await.unwrap();

        assert_eq!(diff, "M schema.ts\n");
        let specs = factory.specs.lock().unwrap();
        assert_eq!(specs[0].base_image, "alpine/git");
        assert!(specs[0].setup_commands.is_empty());
    }

    #[tokio::test]
    async fn diff_failure_is_reported_inline() {
        let session = Session::start(actors("<App />"), "counter", PipelineConfig::default())
            .await
            .unwrap();
        let factory = Recorder {
            fail_diff: true,
            ..Recorder::default()
        };

        let diff = session.diff_with(BTreeMap::new(), &factory).await.unwrap();
        assert_eq!(diff, "# ERROR GENERATING DIFF: git exited with 128");
    }
}

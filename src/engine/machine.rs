//! Statechart interpreter.

use super::error::EngineError;
use crate::chart::{StateChart, StateIndex, Transition, ROOT_ID};
use crate::checkpoint::{Checkpoint, CheckpointError};
use crate::config::EngineConfig;
use crate::core::{Context, Event, StateHistory, StateId, StateTransition, Trigger};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Active leaf has no invoke
    Stable,
    /// An invoke of the active leaf started and has not finished
    Invoking,
}

/// Runs a [`StateChart`] over a context.
///
/// The machine holds the active chain (root down to the active leaf), the
/// context and the transition history. Events are processed one at a time
/// through [`send`](Self::send), which borrows the machine mutably for as
/// long as invoked actors run.
pub struct StateMachine<C, E> {
    chart: Arc<StateChart<C, E>>,
    context: C,
    chain: Vec<StateIndex>,
    history: StateHistory,
    phase: Phase,
    config: EngineConfig,
}

impl<C: Context, E: Event> StateMachine<C, E> {
    /// Create a machine at the root. Nothing runs until the first event.
    pub fn start(chart: Arc<StateChart<C, E>>, context: C) -> Self {
        let root = chart.root();
        Self {
            chart,
            context,
            chain: vec![root],
            history: StateHistory::new(),
            phase: Phase::Stable,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn chart(&self) -> &Arc<StateChart<C, E>> {
        &self.chart
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ids from the root's child down to the active leaf.
    pub fn active_path(&self) -> Vec<StateId> {
        self.chart.ids(&self.chain)
    }

    /// Id of the active leaf, `None` before the first transition.
    pub fn current_state_id(&self) -> Option<&StateId> {
        let (_, path) = self.chain.split_first()?;
        path.last().map(|index| self.chart.node(*index).id())
    }

    /// Whether `id` is the active leaf or one of its ancestors.
    pub fn is_in(&self, id: &str) -> bool {
        self.chain.iter().any(|index| self.chart.node(*index).id() == id)
    }

    /// False while an interrupted invoke waits for
    /// [`resume_interrupted`](Self::resume_interrupted).
    pub fn is_stable(&self) -> bool {
        self.phase == Phase::Stable
    }

    pub fn is_final(&self) -> bool {
        self.chart.node(self.leaf()).is_final()
    }

    /// Transition `tag` would take from the active chain, if any.
    pub fn resolve(&self, tag: &str) -> Option<&Transition<C, E>> {
        lookup(&self.chart, &self.chain, tag).map(|(_, transition)| transition)
    }

    /// Process one event and run invokes until a stable state is reached.
    ///
    /// The transition's own actions see the event; invoke outcomes apply
    /// their `on_done` / `on_error` actions before moving on. Returns the id
    /// of the stable state the machine settled in. When no state on the
    /// active chain handles the event, nothing changes.
    ///
    /// After [`EngineError::TransitionLimit`] the machine stays mid-invoke:
    /// `send` and `checkpoint` refuse until
    /// [`resume_interrupted`](Self::resume_interrupted) settles it.
    pub async fn send(&mut self, event: E) -> Result<StateId, EngineError> {
        if self.phase == Phase::Invoking {
            return Err(EngineError::Interrupted {
                state: self.state_name(),
            });
        }

        let chart = Arc::clone(&self.chart);
        let tag = event.key();
        let (depth, transition) = lookup(&chart, &self.chain, tag.as_str()).ok_or_else(|| {
            EngineError::NoMatchingTransition {
                event: tag.to_string(),
                state: self.state_name(),
            }
        })?;
        let target = self.locate(&chart, depth, transition.target())?;

        debug!(event = %tag, from = %self.state_name(), to = %transition.target(), "Resolved transition");
        transition.apply(&mut self.context, &event);
        self.switch(&chart, target, Trigger::Event(tag));

        self.run_invokes(&chart).await?;
        Ok(self.leaf_id())
    }

    /// Re-run the invoke of the active state after an interruption or a
    /// [`EngineError::TransitionLimit`]. The limit applies afresh.
    pub async fn resume_interrupted(&mut self) -> Result<StateId, EngineError> {
        if self.phase == Phase::Stable {
            return Err(EngineError::NotInterrupted);
        }

        info!(state = %self.state_name(), "Resuming interrupted invoke");
        let chart = Arc::clone(&self.chart);
        self.run_invokes(&chart).await?;
        Ok(self.leaf_id())
    }

    /// Snapshot the machine. Only stable states can be checkpointed.
    pub fn checkpoint(&self) -> Result<Checkpoint, CheckpointError> {
        if self.phase == Phase::Invoking {
            return Err(CheckpointError::NotStable {
                state: self.state_name(),
            });
        }

        let context = self.context.dump()?;
        let checkpoint = Checkpoint::new(self.active_path(), context, self.history.clone());
        debug!(checkpoint = %checkpoint.id, state = %self.state_name(), "Created checkpoint");
        Ok(checkpoint)
    }

    /// Rebuild a machine from a checkpoint taken against the same chart.
    ///
    /// The stored path is walked from the root; its last state must be one
    /// the machine could have settled in. No invoke runs.
    pub fn restore(
        chart: Arc<StateChart<C, E>>,
        checkpoint: Checkpoint,
    ) -> Result<Self, CheckpointError> {
        let invalid = |reason: &str| CheckpointError::InvalidPath {
            path: checkpoint.active_path.iter().map(ToString::to_string).collect(),
            reason: reason.to_string(),
        };

        let chain = chart
            .walk(&checkpoint.active_path)
            .ok_or_else(|| invalid("no chain of child states matches"))?;
        if let [_, .., leaf] = chain.as_slice() {
            let node = chart.node(*leaf);
            if node.invoke().is_some() {
                return Err(invalid("active state has an invoke"));
            }
            if chart.entry_chain(*leaf).len() > 1 {
                return Err(invalid("active state always enters an initial child"));
            }
        }

        let context = C::load(checkpoint.context)?;
        let machine = Self {
            chart,
            context,
            chain,
            history: checkpoint.history,
            phase: Phase::Stable,
            config: EngineConfig::default(),
        };

        info!(checkpoint = %checkpoint.id, state = %machine.state_name(), "Restored state machine");
        Ok(machine)
    }

    async fn run_invokes(&mut self, chart: &StateChart<C, E>) -> Result<(), EngineError> {
        let limit = self.config.max_internal_transitions;
        let mut taken = 0;

        while let Some(invoke) = chart.node(self.leaf()).invoke() {
            self.phase = Phase::Invoking;
            let state = self.state_name();
            if taken == limit {
                return Err(EngineError::TransitionLimit { limit, state });
            }
            taken += 1;
            let depth = self.chain.len() - 1;

            debug!(state = %state, actor = invoke.actor_name(), "Invoking actor");
            match invoke.call(&self.context).await {
                Ok(output) => {
                    info!(state = %state, actor = invoke.actor_name(), "Actor finished");
                    let target = self.locate(chart, depth, invoke.on_done().target())?;
                    invoke.on_done().apply(&mut self.context, &output);
                    self.switch(chart, target, Trigger::Done);
                }
                Err(error) => {
                    warn!(state = %state, actor = invoke.actor_name(), error = %error, "Actor failed");
                    let target = self.locate(chart, depth, invoke.on_error().target())?;
                    invoke.on_error().apply(&mut self.context, &error);
                    self.switch(chart, target, Trigger::Error);
                }
            }
        }

        self.phase = Phase::Stable;
        Ok(())
    }

    /// Nearest state on the active chain, from `depth` upward, owning a
    /// child `target`: its depth in the chain and the child's index.
    ///
    /// `depth` is the chain position of the state declaring the transition,
    /// so states nested below it never capture the target.
    fn locate(
        &self,
        chart: &StateChart<C, E>,
        depth: usize,
        target: &StateId,
    ) -> Result<(usize, StateIndex), EngineError> {
        self.chain[..=depth]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, index)| {
                chart
                    .node(*index)
                    .child(target.as_str())
                    .map(|child| (depth, child))
            })
            .ok_or_else(|| EngineError::UnknownTarget {
                state: self.state_name(),
                target: target.to_string(),
            })
    }

    fn switch(
        &mut self,
        chart: &StateChart<C, E>,
        (depth, child): (usize, StateIndex),
        trigger: Trigger,
    ) {
        let from = self.current_state_id().cloned();
        self.chain.truncate(depth + 1);
        self.chain.extend(chart.entry_chain(child));

        let to = self.leaf_id();
        info!(
            from = from.as_ref().map_or(ROOT_ID, StateId::as_str),
            to = %to,
            "Entered state"
        );
        self.history = self.history.record(StateTransition {
            from,
            to,
            timestamp: Utc::now(),
            trigger,
        });
    }

    fn leaf(&self) -> StateIndex {
        self.chain.last().copied().unwrap_or_else(|| self.chart.root())
    }

    fn leaf_id(&self) -> StateId {
        self.chart.node(self.leaf()).id().clone()
    }

    fn state_name(&self) -> String {
        self.chart.node(self.leaf()).id().to_string()
    }
}

/// First transition for `tag` from the leaf upward, with the chain depth of
/// the state declaring it. The search stops after a final state.
fn lookup<'a, C, E>(
    chart: &'a StateChart<C, E>,
    chain: &[StateIndex],
    tag: &str,
) -> Option<(usize, &'a Transition<C, E>)> {
    for (depth, index) in chain.iter().enumerate().rev() {
        let node = chart.node(*index);
        if let Some(transition) = node.transition(tag) {
            return Some((depth, transition));
        }
        if node.is_final() {
            break;
        }
    }
    None
}

impl<C, E> fmt::Debug for StateMachine<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("active_path", &self.chart.ids(&self.chain))
            .field("phase", &self.phase)
            .field("transitions", &self.history.transitions().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{actor_fn, Actor, ActorError, ActorOutput};
    use crate::builder::{InvokeBuilder, StateBuilder};
    use crate::core::Signal;
    use crate::trajectory::{aggregate_output, FileChange, FileChanges, Solution};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Ctx {
        prompt: String,
        feedback: Option<String>,
        files: BTreeMap<String, String>,
        error: Option<String>,
    }

    impl Context for Ctx {}

    fn ctx(prompt: &str) -> Ctx {
        Ctx {
            prompt: prompt.to_string(),
            ..Ctx::default()
        }
    }

    fn write(path: &str, content: &str) -> ActorOutput {
        Solution::from_changes(FileChanges::from([(
            path.to_string(),
            FileChange::Write(content.to_string()),
        )]))
        .into()
    }

    fn counting_draft(calls: Arc<AtomicUsize>) -> impl Actor<Input = String> {
        actor_fn("draft", move |prompt: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ActorError>(write("a.ts", &prompt)) }
        })
    }

    fn chart(draft: impl Actor<Input = String> + 'static) -> Arc<StateChart<Ctx, Signal>> {
        let invoke = InvokeBuilder::new(draft, |ctx: &Ctx| {
            ctx.feedback.clone().unwrap_or_else(|| ctx.prompt.clone())
        })
        .on_done("review")
        .done_action(|ctx: &mut Ctx, output: &ActorOutput| {
            aggregate_output(output).apply_to(&mut ctx.files)
        })
        .on_error("failure")
        .error_action(|ctx: &mut Ctx, error: &ActorError| ctx.error = Some(error.to_string()))
        .build()
        .unwrap();

        let chart = StateBuilder::root()
            .on("CONFIRM", "draft")
            .child(StateBuilder::new("draft").invoke(invoke))
            .child(
                StateBuilder::new("review")
                    .on("CONFIRM", "done")
                    .on_with("FEEDBACK", "draft", |ctx: &mut Ctx, event: &Signal| {
                        ctx.feedback = event
                            .payload
                            .as_ref()
                            .and_then(|payload| payload.as_str())
                            .map(str::to_string);
                    }),
            )
            .child(StateBuilder::new("done").final_state())
            .child(StateBuilder::new("failure").final_state())
            .build()
            .unwrap();
        Arc::new(chart)
    }

    #[tokio::test]
    async fn start_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let machine = StateMachine::start(chart(counting_draft(calls.clone())), ctx("counter"));

        assert!(machine.active_path().is_empty());
        assert!(machine.current_state_id().is_none());
        assert!(machine.is_stable());
        assert!(!machine.is_final());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_runs_invoke_until_stable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut machine = StateMachine::start(chart(counting_draft(calls.clone())), ctx("counter"));

        let state = machine.send(Signal::new("CONFIRM")).await.unwrap();

        assert_eq!(state, "review");
        assert_eq!(machine.active_path(), vec![StateId::from("review")]);
        assert_eq!(machine.context().files["a.ts"], "counter");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let transitions = machine.history().transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].trigger, Trigger::Event("CONFIRM".into()));
        assert_eq!(transitions[0].from, None);
        assert_eq!(transitions[1].trigger, Trigger::Done);
        assert_eq!(transitions[1].to, "review");
    }

    #[tokio::test]
    async fn leaf_transition_shadows_ancestor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut machine = StateMachine::start(chart(counting_draft(calls.clone())), ctx("counter"));
        machine.send(Signal::new("CONFIRM")).await.unwrap();

        assert_eq!(machine.resolve("CONFIRM").unwrap().target(), "done");
        let state = machine.send(Signal::new("CONFIRM")).await.unwrap();

        assert_eq!(state, "done");
        assert!(machine.is_final());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transition_action_receives_event_payload() {
        let mut machine = StateMachine::start(
            chart(actor_fn("draft", |input: String| async move {
                Ok::<_, ActorError>(write("a.ts", &input))
            })),
            ctx("counter"),
        );
        machine.send(Signal::new("CONFIRM")).await.unwrap();

        let state = machine
            .send(Signal::with_payload("FEEDBACK", json!("add a reset button")))
            .await
            .unwrap();

        assert_eq!(state, "review");
        assert_eq!(machine.context().feedback.as_deref(), Some("add a reset button"));
        assert_eq!(machine.context().files["a.ts"], "add a reset button");
        assert_eq!(machine.history().visits("draft"), 2);
    }

    #[tokio::test]
    async fn actor_failure_follows_error_transition() {
        let failing = actor_fn("draft", |_: String| async move {
            Err::<ActorOutput, _>(ActorError::failed("model unavailable"))
        });
        let mut machine = StateMachine::start(chart(failing), ctx("counter"));

        let state = machine.send(Signal::new("CONFIRM")).await.unwrap();

        assert_eq!(state, "failure");
        assert_eq!(machine.context().error.as_deref(), Some("model unavailable"));
        assert!(machine.context().files.is_empty());
        assert_eq!(machine.history().transitions()[1].trigger, Trigger::Error);
    }

    #[tokio::test]
    async fn final_state_does_not_bubble() {
        let failing = actor_fn("draft", |_: String| async move {
            Err::<ActorOutput, _>(ActorError::failed("boom"))
        });
        let mut machine = StateMachine::start(chart(failing), ctx("counter"));
        machine.send(Signal::new("CONFIRM")).await.unwrap();

        assert!(machine.resolve("CONFIRM").is_none());
        let result = machine.send(Signal::new("CONFIRM")).await;

        assert_eq!(
            result.unwrap_err(),
            EngineError::NoMatchingTransition {
                event: "CONFIRM".to_string(),
                state: "failure".to_string(),
            }
        );
        assert_eq!(machine.active_path(), vec![StateId::from("failure")]);
    }

    #[tokio::test]
    async fn unknown_event_leaves_machine_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut machine = StateMachine::start(chart(counting_draft(calls.clone())), ctx("counter"));

        let result = machine.send(Signal::new("DEPLOY")).await;

        assert!(matches!(
            result,
            Err(EngineError::NoMatchingTransition { ref state, .. }) if state == ROOT_ID
        ));
        assert!(machine.active_path().is_empty());
        assert!(machine.history().transitions().is_empty());
    }

    #[tokio::test]
    async fn checkpoint_restore_resumes_at_gate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chart = chart(counting_draft(calls.clone()));
        let mut machine = StateMachine::start(Arc::clone(&chart), ctx("counter"));
        machine.send(Signal::new("CONFIRM")).await.unwrap();

        let checkpoint = machine.checkpoint().unwrap();
        let json = checkpoint.to_json().unwrap();
        let restored_checkpoint = Checkpoint::from_json(&json).unwrap();

        let mut restored = StateMachine::restore(Arc::clone(&chart), restored_checkpoint).unwrap();
        assert_eq!(restored.active_path(), machine.active_path());
        assert_eq!(restored.context(), machine.context());
        assert_eq!(restored.history(), machine.history());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let state = restored.send(Signal::new("CONFIRM")).await.unwrap();
        assert_eq!(state, "done");
    }

    #[tokio::test]
    async fn restore_rejects_unknown_path() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chart = chart(counting_draft(calls));
        let mut checkpoint = StateMachine::start(Arc::clone(&chart), ctx("counter"))
            .checkpoint()
            .unwrap();
        checkpoint.active_path = vec![StateId::from("review"), StateId::from("nested")];

        let result = StateMachine::restore(chart, checkpoint);
        assert!(matches!(
            result,
            Err(CheckpointError::InvalidPath { ref path, .. }) if path == &["review", "nested"]
        ));
    }

    #[tokio::test]
    async fn restore_rejects_invoking_leaf() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chart = chart(counting_draft(calls.clone()));
        let mut checkpoint = StateMachine::start(Arc::clone(&chart), ctx("counter"))
            .checkpoint()
            .unwrap();
        checkpoint.active_path = vec![StateId::from("draft")];

        assert!(matches!(
            StateMachine::restore(chart, checkpoint),
            Err(CheckpointError::InvalidPath { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dropped_send_leaves_invoke_interrupted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stalls_once = {
            let calls = Arc::clone(&calls);
            actor_fn("draft", move |prompt: String| {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        futures::future::pending::<()>().await;
                    }
                    Ok::<_, ActorError>(write("a.ts", &prompt))
                }
            })
        };
        let mut machine = StateMachine::start(chart(stalls_once), ctx("counter"));

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), machine.send(Signal::new("CONFIRM")))
                .await;
        assert!(timed_out.is_err());

        assert!(!machine.is_stable());
        assert_eq!(machine.current_state_id().unwrap(), "draft");
        assert!(matches!(
            machine.checkpoint(),
            Err(CheckpointError::NotStable { ref state }) if state == "draft"
        ));
        assert_eq!(
            machine.send(Signal::new("CONFIRM")).await.unwrap_err(),
            EngineError::Interrupted {
                state: "draft".to_string()
            }
        );

        let state = machine.resume_interrupted().await.unwrap();
        assert_eq!(state, "review");
        assert!(machine.is_stable());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(machine.checkpoint().is_ok());
    }

    #[tokio::test]
    async fn resume_without_interruption_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut machine = StateMachine::start(chart(counting_draft(calls)), ctx("counter"));
        assert_eq!(
            machine.resume_interrupted().await.unwrap_err(),
            EngineError::NotInterrupted
        );
    }

    #[tokio::test]
    async fn invoke_cycle_hits_transition_limit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let invoke = InvokeBuilder::new(counting_draft(calls.clone()), |ctx: &Ctx| ctx.prompt.clone())
            .on_done("spin")
            .on_error("spin")
            .build()
            .unwrap();
        let chart = StateBuilder::<Ctx, Signal>::root()
            .on("GO", "spin")
            .child(StateBuilder::new("spin").invoke(invoke))
            .build()
            .unwrap();

        let mut machine = StateMachine::start(Arc::new(chart), ctx("loop"))
            .with_config(EngineConfig::default().max_internal_transitions(3));
        let result = machine.send(Signal::new("GO")).await;

        assert_eq!(
            result.unwrap_err(),
            EngineError::TransitionLimit {
                limit: 3,
                state: "spin".to_string()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!machine.is_stable());
    }

    #[tokio::test]
    async fn resume_settles_machine_after_transition_limit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let flaky = {
            let calls = calls.clone();
            actor_fn("flaky", move |_: String| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 3 {
                        Ok(write("a.ts", "retry"))
                    } else {
                        Err(ActorError::failed("gave up"))
                    }
                }
            })
        };
        let invoke = InvokeBuilder::new(flaky, |ctx: &Ctx| ctx.prompt.clone())
            .on_done("spin")
            .on_error("stop")
            .build()
            .unwrap();
        let chart = StateBuilder::<Ctx, Signal>::root()
            .on("GO", "spin")
            .child(StateBuilder::new("spin").invoke(invoke))
            .child(StateBuilder::new("stop"))
            .build()
            .unwrap();
        let mut machine = StateMachine::start(Arc::new(chart), ctx("loop"))
            .with_config(EngineConfig::default().max_internal_transitions(3));

        let limited = machine.send(Signal::new("GO")).await;
        assert!(matches!(limited, Err(EngineError::TransitionLimit { .. })));
        assert!(matches!(
            machine.checkpoint(),
            Err(CheckpointError::NotStable { .. })
        ));
        assert!(matches!(
            machine.send(Signal::new("GO")).await,
            Err(EngineError::Interrupted { .. })
        ));

        assert_eq!(machine.resume_interrupted().await.unwrap(), "stop");
        assert!(machine.is_stable());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(machine.checkpoint().is_ok());
    }

    #[tokio::test]
    async fn nested_states_bubble_and_descend() {
        let chart = StateBuilder::<Ctx, &'static str>::root()
            .on("START", "stage")
            .child(
                StateBuilder::new("stage")
                    .initial("first")
                    .on("NEXT", "second")
                    .on("ESCAPE", "outside")
                    .child(StateBuilder::new("first"))
                    .child(StateBuilder::new("second")),
            )
            .child(StateBuilder::new("outside"))
            .build()
            .unwrap();
        let mut machine = StateMachine::start(Arc::new(chart), Ctx::default());

        assert_eq!(machine.send("START").await.unwrap(), "first");
        assert_eq!(
            machine.active_path(),
            vec![StateId::from("stage"), StateId::from("first")]
        );
        assert!(machine.is_in("stage"));

        assert_eq!(machine.send("NEXT").await.unwrap(), "second");
        assert_eq!(machine.send("ESCAPE").await.unwrap(), "outside");
        assert!(!machine.is_in("stage"));
        assert_eq!(machine.history().get_path().len(), 3);
    }

    #[tokio::test]
    async fn ancestor_transition_targets_its_own_child() {
        let chart = StateBuilder::<Ctx, &'static str>::root()
            .on("START", "stage")
            .on("ABORT", "failure")
            .child(
                StateBuilder::new("stage")
                    .initial("inner")
                    .child(StateBuilder::new("inner"))
                    .child(StateBuilder::new("failure")),
            )
            .child(StateBuilder::new("failure").final_state())
            .build()
            .unwrap();
        let mut machine = StateMachine::start(Arc::new(chart), Ctx::default());

        assert_eq!(machine.send("START").await.unwrap(), "inner");
        assert_eq!(machine.send("ABORT").await.unwrap(), "failure");

        assert_eq!(machine.active_path(), vec![StateId::from("failure")]);
        assert!(machine.is_final());
        assert!(!machine.is_in("stage"));
    }

    #[tokio::test]
    async fn restore_rejects_composite_leaf() {
        let chart = Arc::new(
            StateBuilder::<Ctx, &'static str>::root()
                .child(
                    StateBuilder::new("stage")
                        .initial("first")
                        .child(StateBuilder::new("first")),
                )
                .build()
                .unwrap(),
        );
        let checkpoint = Checkpoint::new(
            vec![StateId::from("stage")],
            Ctx::default().dump().unwrap(),
            StateHistory::new(),
        );

        assert!(matches!(
            StateMachine::restore(chart, checkpoint),
            Err(CheckpointError::InvalidPath { .. })
        ));
    }
}

//! Builder for state trees.

use crate::chart::{
    check, finish, validate_structure, Action, ChartError, ChartValidation, ChartViolation, Invoke,
    Outcome, StateChart, StateIndex, StateNode, Transition, ROOT_ID,
};
use crate::core::{EventTag, StateId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Declarative description of one state and its subtree.
///
/// # Example
///
/// ```rust
/// use waypoint::builder::StateBuilder;
/// use waypoint::core::Signal;
///
/// #[derive(Default)]
/// struct Ctx {
///     notes: Vec<String>,
/// }
///
/// let chart = StateBuilder::<Ctx, Signal>::root()
///     .on("START", "editing")
///     .child(StateBuilder::new("editing").on("SAVE", "saved"))
///     .child(StateBuilder::new("saved").final_state())
///     .build()
///     .unwrap();
///
/// assert_eq!(chart.len(), 3);
/// ```
pub struct StateBuilder<C, E> {
    id: StateId,
    on: Vec<(EventTag, Transition<C, E>)>,
    children: Vec<StateBuilder<C, E>>,
    initial: Option<StateId>,
    invoke: Option<Invoke<C>>,
    is_final: bool,
}

impl<C, E> StateBuilder<C, E> {
    pub fn new(id: impl Into<StateId>) -> Self {
        Self {
            id: id.into(),
            on: Vec::new(),
            children: Vec::new(),
            initial: None,
            invoke: None,
            is_final: false,
        }
    }

    /// Builder for the root of a chart.
    pub fn root() -> Self {
        Self::new(ROOT_ID)
    }

    /// Add a transition taken on `event`.
    pub fn on(mut self, event: impl Into<EventTag>, target: impl Into<StateId>) -> Self {
        self.on.push((event.into(), Outcome::new(target)));
        self
    }

    /// Add a transition whose action receives the triggering event.
    pub fn on_with<F>(mut self, event: impl Into<EventTag>, target: impl Into<StateId>, action: F) -> Self
    where
        F: Fn(&mut C, &E) + Send + Sync + 'static,
    {
        let action: Action<C, E> = Arc::new(action);
        self.on.push((
            event.into(),
            Outcome {
                target: target.into(),
                actions: vec![action],
            },
        ));
        self
    }

    /// Add a child state.
    pub fn child(mut self, state: StateBuilder<C, E>) -> Self {
        self.children.push(state);
        self
    }

    /// Child entered automatically when this state is entered.
    pub fn initial(mut self, id: impl Into<StateId>) -> Self {
        self.initial = Some(id.into());
        self
    }

    /// Bind an actor invoked on entry.
    pub fn invoke(mut self, invoke: Invoke<C>) -> Self {
        self.invoke = Some(invoke);
        self
    }

    /// Mark the state absorbing: events not in its own table are rejected
    /// instead of bubbling to ancestors.
    pub fn final_state(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Flatten and validate the tree rooted here.
    ///
    /// All violations are reported at once.
    pub fn build(self) -> Result<StateChart<C, E>, ChartError> {
        let mut nodes = Vec::new();
        let mut checks = Vec::new();
        flatten(self, None, &mut nodes, &mut checks);
        checks.extend(validate_structure(&nodes));
        finish(checks)?;
        Ok(StateChart::from_nodes(nodes))
    }
}

/// Append `state` and its subtree in pre-order, returning its index.
fn flatten<C, E>(
    state: StateBuilder<C, E>,
    parent: Option<StateIndex>,
    nodes: &mut Vec<StateNode<C, E>>,
    checks: &mut Vec<ChartValidation>,
) -> StateIndex {
    let index = StateIndex::new(nodes.len());
    let StateBuilder {
        id,
        on,
        children,
        initial,
        invoke,
        is_final,
    } = state;

    let mut table = BTreeMap::new();
    for (event, transition) in on {
        let event_name = event.to_string();
        let fresh = table.insert(event, transition).is_none();
        checks.push(check(fresh, || ChartViolation::DuplicateTransition {
            state: id.to_string(),
            event: event_name,
        }));
    }

    nodes.push(StateNode {
        id: id.clone(),
        parent,
        children: BTreeMap::new(),
        initial,
        on: table,
        invoke,
        is_final,
    });

    for child in children {
        let child_id = child.id.clone();
        let child_index = flatten(child, Some(index), nodes, checks);
        let fresh = nodes[index.get()]
            .children
            .insert(child_id.clone(), child_index)
            .is_none();
        checks.push(check(fresh, || ChartViolation::DuplicateChild {
            parent: id.to_string(),
            id: child_id.to_string(),
        }));
    }

    index
}

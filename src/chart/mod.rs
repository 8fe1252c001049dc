//! Immutable state chart.
//!
//! A chart is a tree of states flattened into an arena and addressed by
//! [`StateIndex`]. Each state is one of:
//!
//! - **composite**: has named children and optionally an `initial` child that
//!   is entered automatically;
//! - **invoking**: has an [`Invoke`] that runs an actor on entry and moves on
//!   to its `on_done` or `on_error` target;
//! - **gate**: has only a transition table, and waits for the next event.
//!
//! Charts are built and validated through [`StateBuilder`](crate::builder::StateBuilder)
//! and never change afterwards, so one chart can back any number of engines
//! and every checkpoint it produced.

mod validation;

pub use validation::{ChartError, ChartViolation};

pub(crate) use validation::{check, finish, validate_structure, ChartValidation};

use crate::actor::{ActorError, ActorOutput, InvokeFuture};
use crate::core::{EventTag, StateId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Id of the root state. It never appears in an active path.
pub const ROOT_ID: &str = "#root";

/// Synchronous context update run by the engine.
pub type Action<C, T> = Arc<dyn Fn(&mut C, &T) + Send + Sync>;

pub(crate) type InvokeFn<C> = Arc<dyn Fn(&C) -> InvokeFuture + Send + Sync>;

/// Target state plus the actions to apply before entering it.
pub struct Outcome<C, T> {
    pub(crate) target: StateId,
    pub(crate) actions: Vec<Action<C, T>>,
}

/// An event-driven transition: its actions receive the event.
pub type Transition<C, E> = Outcome<C, E>;

impl<C, T> Outcome<C, T> {
    pub fn new(target: impl Into<StateId>) -> Self {
        Self {
            target: target.into(),
            actions: Vec::new(),
        }
    }

    pub fn target(&self) -> &StateId {
        &self.target
    }

    pub fn actions(&self) -> &[Action<C, T>] {
        &self.actions
    }

    /// Run every action in declaration order.
    pub(crate) fn apply(&self, context: &mut C, value: &T) {
        for action in &self.actions {
            action(context, value);
        }
    }
}

impl<C, T> Clone for Outcome<C, T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            actions: self.actions.clone(),
        }
    }
}

impl<C, T> fmt::Debug for Outcome<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outcome")
            .field("target", &self.target)
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// Actor binding of an invoking state.
pub struct Invoke<C> {
    pub(crate) actor: String,
    pub(crate) call: InvokeFn<C>,
    pub(crate) on_done: Outcome<C, ActorOutput>,
    pub(crate) on_error: Outcome<C, ActorError>,
}

impl<C> Invoke<C> {
    pub fn actor_name(&self) -> &str {
        &self.actor
    }

    pub fn on_done(&self) -> &Outcome<C, ActorOutput> {
        &self.on_done
    }

    pub fn on_error(&self) -> &Outcome<C, ActorError> {
        &self.on_error
    }

    /// Compute the actor input from `context` and start the call.
    pub(crate) fn call(&self, context: &C) -> InvokeFuture {
        (self.call)(context)
    }
}

impl<C> fmt::Debug for Invoke<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoke")
            .field("actor", &self.actor)
            .field("on_done", &self.on_done)
            .field("on_error", &self.on_error)
            .finish()
    }
}

/// Position of a state in its chart's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateIndex(usize);

impl StateIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// Shape of a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateKind {
    Composite,
    Invoking,
    Gate,
}

/// One state of a chart.
pub struct StateNode<C, E> {
    pub(crate) id: StateId,
    pub(crate) parent: Option<StateIndex>,
    pub(crate) children: BTreeMap<StateId, StateIndex>,
    pub(crate) initial: Option<StateId>,
    pub(crate) on: BTreeMap<EventTag, Transition<C, E>>,
    pub(crate) invoke: Option<Invoke<C>>,
    pub(crate) is_final: bool,
}

impl<C, E> StateNode<C, E> {
    pub fn id(&self) -> &StateId {
        &self.id
    }

    pub fn parent(&self) -> Option<StateIndex> {
        self.parent
    }

    pub fn children(&self) -> &BTreeMap<StateId, StateIndex> {
        &self.children
    }

    pub fn child(&self, id: &str) -> Option<StateIndex> {
        self.children.get(id).copied()
    }

    pub fn initial(&self) -> Option<&StateId> {
        self.initial.as_ref()
    }

    pub fn transition(&self, tag: &str) -> Option<&Transition<C, E>> {
        self.on.get(tag)
    }

    /// Event tags this state handles itself, ancestors excluded.
    pub fn events(&self) -> impl Iterator<Item = &EventTag> {
        self.on.keys()
    }

    pub fn invoke(&self) -> Option<&Invoke<C>> {
        self.invoke.as_ref()
    }

    /// Final states are absorbing: event lookup stops at them.
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn kind(&self) -> StateKind {
        if self.invoke.is_some() {
            StateKind::Invoking
        } else if !self.children.is_empty() {
            StateKind::Composite
        } else {
            StateKind::Gate
        }
    }
}

/// Validated, immutable state tree.
pub struct StateChart<C, E> {
    nodes: Vec<StateNode<C, E>>,
}

impl<C, E> StateChart<C, E> {
    /// Wrap already validated nodes; index 0 is the root.
    pub(crate) fn from_nodes(nodes: Vec<StateNode<C, E>>) -> Self {
        Self { nodes }
    }

    pub fn root(&self) -> StateIndex {
        StateIndex(0)
    }

    pub fn node(&self, index: StateIndex) -> &StateNode<C, E> {
        &self.nodes[index.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk `path` (root excluded) child by child from the root.
    ///
    /// Returns the chain of indices starting with the root, or `None` when a
    /// step names no child of the previous state.
    pub fn walk<S: AsRef<str>>(&self, path: &[S]) -> Option<Vec<StateIndex>> {
        let mut chain = Vec::with_capacity(path.len() + 1);
        let mut cursor = self.root();
        chain.push(cursor);
        for id in path {
            cursor = self.node(cursor).child(id.as_ref())?;
            chain.push(cursor);
        }
        Some(chain)
    }

    /// Indices entered when `index` is entered: `index` itself followed by
    /// its chain of initial children.
    pub fn entry_chain(&self, index: StateIndex) -> Vec<StateIndex> {
        let mut chain = vec![index];
        let mut cursor = index;
        while let Some(next) = self
            .node(cursor)
            .initial()
            .and_then(|initial| self.node(cursor).child(initial.as_str()))
        {
            chain.push(next);
            cursor = next;
        }
        chain
    }

    /// Ids from the root's child down to `chain`'s last state.
    pub fn ids(&self, chain: &[StateIndex]) -> Vec<StateId> {
        chain
            .iter()
            .skip(1)
            .map(|index| self.node(*index).id.clone())
            .collect()
    }

    /// Find a state anywhere in the chart by id, depth-first.
    pub fn find(&self, id: &str) -> Option<StateIndex> {
        self.nodes
            .iter()
            .position(|node| node.id == *id)
            .map(StateIndex)
    }
}

impl<C, E> fmt::Debug for StateChart<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateChart")
            .field("states", &self.nodes.len())
            .finish()
    }
}

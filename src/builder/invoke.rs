//! Builder for actor bindings.

use crate::actor::{Actor, ActorError, ActorOutput};
use crate::builder::error::BuildError;
use crate::chart::{Action, Invoke, InvokeFn, Outcome};
use crate::core::StateId;
use futures::FutureExt;
use std::sync::Arc;

/// Builder for an [`Invoke`] with a fluent API.
///
/// The input function must be pure: it derives the actor's input from the
/// context and nothing else.
///
/// # Example
///
/// ```rust
/// use waypoint::actor::{actor_fn, ActorError};
/// use waypoint::builder::InvokeBuilder;
///
/// struct Ctx {
///     prompt: String,
///     error: Option<String>,
/// }
///
/// let draft = actor_fn("draft", |_prompt: String| async move {
///     Err(ActorError::failed("offline"))
/// });
///
/// let invoke = InvokeBuilder::new(draft, |ctx: &Ctx| ctx.prompt.clone())
///     .on_done("review")
///     .on_error("failure")
///     .error_action(|ctx: &mut Ctx, error: &ActorError| ctx.error = Some(error.to_string()))
///     .build()
///     .unwrap();
///
/// assert_eq!(invoke.actor_name(), "draft");
/// ```
pub struct InvokeBuilder<C> {
    actor: String,
    call: InvokeFn<C>,
    on_done: Option<StateId>,
    done_actions: Vec<Action<C, ActorOutput>>,
    on_error: Option<StateId>,
    error_actions: Vec<Action<C, ActorError>>,
}

impl<C: 'static> InvokeBuilder<C> {
    /// Bind `actor`, feeding it `input(context)` on every entry.
    pub fn new<A, F>(actor: A, input: F) -> Self
    where
        A: Actor + 'static,
        F: Fn(&C) -> A::Input + Send + Sync + 'static,
    {
        let name = actor.name().to_string();
        let actor = Arc::new(actor);
        let call: InvokeFn<C> = Arc::new(move |context: &C| {
            let input = input(context);
            let actor = Arc::clone(&actor);
            async move { actor.invoke(input).await }.boxed()
        });

        Self {
            actor: name,
            call,
            on_done: None,
            done_actions: Vec::new(),
            on_error: None,
            error_actions: Vec::new(),
        }
    }

    /// Override the actor name used in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.actor = name.into();
        self
    }

    /// Set the state entered after success (required).
    pub fn on_done(mut self, target: impl Into<StateId>) -> Self {
        self.on_done = Some(target.into());
        self
    }

    /// Append an action applied to the context on success.
    pub fn done_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut C, &ActorOutput) + Send + Sync + 'static,
    {
        self.done_actions.push(Arc::new(action));
        self
    }

    /// Set the state entered after failure (required).
    pub fn on_error(mut self, target: impl Into<StateId>) -> Self {
        self.on_error = Some(target.into());
        self
    }

    /// Append an action applied to the context on failure.
    pub fn error_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut C, &ActorError) + Send + Sync + 'static,
    {
        self.error_actions.push(Arc::new(action));
        self
    }

    /// Build the binding.
    pub fn build(self) -> Result<Invoke<C>, BuildError> {
        let done_target = self.on_done.ok_or_else(|| BuildError::MissingDoneTarget {
            actor: self.actor.clone(),
        })?;
        let error_target = self.on_error.ok_or_else(|| BuildError::MissingErrorTarget {
            actor: self.actor.clone(),
        })?;

        Ok(Invoke {
            actor: self.actor,
            call: self.call,
            on_done: Outcome {
                target: done_target,
                actions: self.done_actions,
            },
            on_error: Outcome {
                target: error_target,
                actions: self.error_actions,
            },
        })
    }
}

//! Actor invocation protocol.
//!
//! An actor is a long-running asynchronous computation bound to a chart state.
//! It receives an input computed from the context, never the context itself,
//! and returns either a trajectory [`Solution`] or a named set of results.
//! Only the engine's `on_done` / `on_error` actions may fold that result back
//! into the context.

mod concurrent;

pub use concurrent::ConcurrentActor;

use crate::trajectory::Solution;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Successful result of an invoke.
#[derive(Clone, Debug)]
pub enum ActorOutput {
    /// Terminal node of one trajectory.
    Node(Solution),
    /// Results of named sub-actors.
    Named(BTreeMap<String, ActorOutput>),
}

impl ActorOutput {
    pub fn as_node(&self) -> Option<&Solution> {
        match self {
            Self::Node(solution) => Some(solution),
            Self::Named(_) => None,
        }
    }

    /// Result of the named sub-actor, if this is a named output.
    pub fn branch(&self, name: &str) -> Option<&ActorOutput> {
        match self {
            Self::Node(_) => None,
            Self::Named(branches) => branches.get(name),
        }
    }
}

impl From<Solution> for ActorOutput {
    fn from(solution: Solution) -> Self {
        Self::Node(solution)
    }
}

/// Failure of an invoke.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActorError {
    #[error("{0}")]
    Failed(String),

    /// A sub-actor of a concurrent actor failed.
    #[error("{name}: {source}")]
    Branch {
        name: String,
        source: Box<ActorError>,
    },

    #[error("Actor '{name}' terminated abnormally: {reason}")]
    Aborted { name: String, reason: String },
}

impl ActorError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Innermost error, looking through concurrent branches.
    pub fn root_cause(&self) -> &ActorError {
        match self {
            Self::Branch { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Future returned by a type-erased invoke.
pub type InvokeFuture = BoxFuture<'static, Result<ActorOutput, ActorError>>;

/// A component callable with context-derived input.
///
/// # Example
///
/// ```rust
/// use waypoint::actor::{Actor, ActorError, ActorOutput};
/// use waypoint::trajectory::{FileChange, FileChanges, Solution};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Actor for Echo {
///     type Input = String;
///
///     async fn invoke(&self, prompt: String) -> Result<ActorOutput, ActorError> {
///         let files = FileChanges::from([("prompt.txt".to_string(), FileChange::Write(prompt))]);
///         Ok(Solution::from_changes(files).into())
///     }
/// }
/// ```
#[async_trait]
pub trait Actor: Send + Sync {
    type Input: Send + 'static;

    async fn invoke(&self, input: Self::Input) -> Result<ActorOutput, ActorError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl<A: Actor + ?Sized> Actor for Arc<A> {
    type Input = A::Input;

    async fn invoke(&self, input: Self::Input) -> Result<ActorOutput, ActorError> {
        (**self).invoke(input).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Actor backed by an async closure.
pub struct FnActor<I, F> {
    name: String,
    f: F,
    _input: PhantomData<fn(I)>,
}

/// Wrap an async closure as a named actor.
///
/// ```rust
/// use waypoint::actor::{actor_fn, ActorError};
///
/// let failing = actor_fn("draft", |_prompt: String| async move {
///     Err(ActorError::failed("model unavailable"))
/// });
/// ```
pub fn actor_fn<I, F, Fut>(name: impl Into<String>, f: F) -> FnActor<I, F>
where
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ActorOutput, ActorError>> + Send + 'static,
    I: Send + 'static,
{
    FnActor {
        name: name.into(),
        f,
        _input: PhantomData,
    }
}

#[async_trait]
impl<I, F, Fut> Actor for FnActor<I, F>
where
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ActorOutput, ActorError>> + Send + 'static,
    I: Send + 'static,
{
    type Input = I;

    async fn invoke(&self, input: I) -> Result<ActorOutput, ActorError> {
        (self.f)(input).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{FileChange, FileChanges};

    #[tokio::test]
    async fn fn_actor_passes_input_through() {
        let actor = actor_fn("echo", |prompt: String| async move {
            let files = FileChanges::from([("out.txt".to_string(), FileChange::Write(prompt))]);
            Ok(Solution::from_changes(files).into())
        });

        assert_eq!(actor.name(), "echo");
        let output = actor.invoke("hello".to_string()).await.unwrap();
        let solution = output.as_node().unwrap();
        let step = solution.steps().next().unwrap();
        assert_eq!(step.files()["out.txt"].content(), Some("hello"));
    }

    #[tokio::test]
    async fn shared_actor_delegates() {
        let actor = Arc::new(actor_fn("fails", |_: ()| async move {
            Err(ActorError::failed("boom"))
        }));

        let result = actor.invoke(()).await;
        assert_eq!(result.unwrap_err(), ActorError::failed("boom"));
        assert_eq!(Actor::name(&actor), "fails");
    }

    #[test]
    fn branch_error_displays_name_and_cause() {
        let error = ActorError::Branch {
            name: "frontend".to_string(),
            source: Box::new(ActorError::failed("build failed")),
        };

        assert_eq!(error.to_string(), "frontend: build failed");
        assert_eq!(error.root_cause(), &ActorError::failed("build failed"));
    }

    #[test]
    fn branch_lookup_on_named_output() {
        let output = ActorOutput::Named(BTreeMap::from([(
            "handlers".to_string(),
            ActorOutput::Node(Solution::from_changes(FileChanges::new())),
        )]));

        assert!(output.branch("handlers").is_some());
        assert!(output.branch("frontend").is_none());
        assert!(output.as_node().is_none());
    }
}

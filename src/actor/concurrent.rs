//! Fan-out/fan-in composition of named actors.

use super::{Actor, ActorError, ActorOutput};
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Runs named sub-actors concurrently on one shared input.
///
/// Every sub-actor gets its own clone of the input and runs on its own tokio
/// task. The composite succeeds with a name → result mapping once all of them
/// finish. The first failure aborts every sub-actor still in flight and
/// becomes the composite's error, wrapped in [`ActorError::Branch`].
/// Dropping the composite's future aborts the sub-actors as well.
///
/// Sub-actors must not share mutable workspace state: give each one an
/// independent clone of whatever it writes to.
pub struct ConcurrentActor<I> {
    actors: BTreeMap<String, Arc<dyn Actor<Input = I>>>,
}

impl<I> ConcurrentActor<I>
where
    I: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            actors: BTreeMap::new(),
        }
    }

    /// Add a named sub-actor, replacing any previous one with that name.
    pub fn with<A>(mut self, name: impl Into<String>, actor: A) -> Self
    where
        A: Actor<Input = I> + 'static,
    {
        self.actors.insert(name.into(), Arc::new(actor));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

impl<I> Default for ConcurrentActor<I>
where
    I: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<I> Actor for ConcurrentActor<I>
where
    I: Clone + Send + Sync + 'static,
{
    type Input = I;

    async fn invoke(&self, input: I) -> Result<ActorOutput, ActorError> {
        let mut tasks = JoinSet::new();
        for (name, actor) in &self.actors {
            let name = name.clone();
            let actor = Arc::clone(actor);
            let input = input.clone();
            tasks.spawn(async move {
                let result = match AssertUnwindSafe(actor.invoke(input)).catch_unwind().await {
                    Ok(result) => result,
                    Err(_) => Err(ActorError::Aborted {
                        name: name.clone(),
                        reason: "panicked".to_string(),
                    }),
                };
                (name, result)
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(output))) => {
                    debug!(branch = %name, "Concurrent branch finished");
                    results.insert(name, output);
                }
                Ok((name, Err(error))) => {
                    warn!(
                        branch = %name,
                        error = %error,
                        remaining = tasks.len(),
                        "Concurrent branch failed, aborting the rest"
                    );
                    tasks.abort_all();
                    return Err(ActorError::Branch {
                        name,
                        source: Box::new(error),
                    });
                }
                Err(join_error) => {
                    tasks.abort_all();
                    return Err(ActorError::Aborted {
                        name: "concurrent".to_string(),
                        reason: join_error.to_string(),
                    });
                }
            }
        }

        Ok(ActorOutput::Named(results))
    }

    fn name(&self) -> &str {
        "concurrent"
    }
}

//! Logging Store
//!
//! Wraps any store and records each committed mutation as a `tracing`
//! event: the mutation's label and the resulting state.

use std::fmt::Debug;

use crate::store::{Selection, Store};

/// A store that logs every mutation of the store it wraps.
///
/// The event is emitted after the wrapped mutation commits and from inside
/// the wrapped store's mutation region, so the logged state is exactly the
/// one the mutation produced.
#[derive(Clone, Debug)]
pub struct LoggingStore<S> {
    inner: S,
}

impl<S> LoggingStore<S>
where
    S: Store,
    S::State: Debug,
{
    /// Wrap `inner`, logging its current state.
    pub fn new(inner: S) -> Self {
        inner.run(|state| tracing::info!(state = ?state, "store created"));
        Self { inner }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap, dropping the logging layer.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> Store for LoggingStore<S>
where
    S: Store,
    S::State: Debug,
{
    type State = S::State;

    fn run<R, F>(&self, task: F) -> R
    where
        F: FnOnce(&Self::State) -> R,
    {
        self.inner.run(task)
    }

    fn try_apply_as<E, F>(&self, label: &str, reducer: F) -> Result<(), E>
    where
        F: FnOnce(&Self::State) -> Result<Self::State, E>,
    {
        self.inner.run(|_| match self.inner.try_apply_as(label, reducer) {
            Ok(()) => {
                self.inner
                    .run(|state| tracing::info!(label, state = ?state, "state after mutation"));
                Ok(())
            }
            Err(err) => {
                tracing::debug!(label, "mutation rejected, state unchanged");
                Err(err)
            }
        })
    }

    fn select(&self) -> Selection<Self::State> {
        self.inner.select()
    }
}

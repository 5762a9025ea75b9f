//! The Store Contract
//!
//! Every store variant (root, child, logging, devtools) implements `Store`.
//! A variant supplies three primitives:
//!
//! - `run`: read the current state inside the store's mutation region
//! - `try_apply_as`: the single mutating primitive
//! - `select`: the replay-latest sequence of states
//!
//! Everything else (`dispatch`, `apply`, `update`, `child`, the `select_*`
//! projections) is derived from those three, so a wrapper that overrides
//! `try_apply_as` observes every mutation regardless of how it was issued.

use std::convert::Infallible;

use super::action::{Action, TryAction};
use super::child::ChildStore;
use super::field::Field;
use super::selection::Selection;

/// Read/write access to one state value, at the root or at any depth.
pub trait Store: Clone + Send + Sync + 'static {
    /// The value this store reads and writes.
    type State: Clone + Send + Sync + 'static;

    /// Call `task` with the current state.
    ///
    /// Nothing is mutated or broadcast. The task runs inside the store's
    /// mutation region, so a write it issues to the same store is computed
    /// against exactly the value it was shown.
    fn run<R, F>(&self, task: F) -> R
    where
        F: FnOnce(&Self::State) -> R;

    /// Replace the state with `reducer(current)`, labelled for diagnostics.
    ///
    /// On `Err` the state is left as it was, nothing is broadcast, and the
    /// error is returned to the caller.
    fn try_apply_as<E, F>(&self, label: &str, reducer: F) -> Result<(), E>
    where
        F: FnOnce(&Self::State) -> Result<Self::State, E>;

    /// The full state, on every change.
    fn select(&self) -> Selection<Self::State>;

    /// One field of the state, whenever its value changes.
    fn select_field<V>(&self, field: &Field<Self::State, V>) -> Selection<V>
    where
        V: Clone + PartialEq + Send + Sync + 'static,
    {
        self.select().select_field(field)
    }

    /// A projection of the state, whenever its value changes.
    fn select_with<U, F>(&self, selector: F) -> Selection<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&Self::State) -> U + Send + Sync + 'static,
    {
        self.select().select_with(selector)
    }

    /// Replace the state with `action.reduce(current)`.
    fn dispatch<A>(&self, action: &A)
    where
        A: Action<Self::State> + ?Sized,
    {
        self.apply_as(action.name(), |state| action.reduce(state));
    }

    /// Replace the state with `action.try_reduce(current)`, if it succeeds.
    fn try_dispatch<A>(&self, action: &A) -> Result<(), A::Error>
    where
        A: TryAction<Self::State> + ?Sized,
    {
        self.try_apply_as(action.name(), |state| action.try_reduce(state))
    }

    /// Replace the state with `f(current)`.
    fn apply<F>(&self, f: F)
    where
        F: FnOnce(&Self::State) -> Self::State,
    {
        self.apply_as("apply", f);
    }

    /// `apply` with an explicit diagnostic label.
    fn apply_as<F>(&self, label: &str, f: F)
    where
        F: FnOnce(&Self::State) -> Self::State,
    {
        let committed = self.try_apply_as(label, |state| Ok::<_, Infallible>(f(state)));
        match committed {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Replace the state with `f(current)`, if it succeeds.
    fn try_apply<E, F>(&self, f: F) -> Result<(), E>
    where
        F: FnOnce(&Self::State) -> Result<Self::State, E>,
    {
        self.try_apply_as("apply", f)
    }

    /// Replace one field of the state.
    fn update<V>(&self, field: &Field<Self::State, V>, value: V)
    where
        V: Clone + Send + Sync + 'static,
    {
        self.update_as(&format!("update {}", field.name()), field, value);
    }

    /// `update` with an explicit diagnostic label.
    fn update_as<V>(&self, label: &str, field: &Field<Self::State, V>, value: V)
    where
        V: Clone + Send + Sync + 'static,
    {
        self.apply_as(label, |state| field.replace(state, value));
    }

    /// A store over the slice of state held in `field`.
    fn child<V>(&self, field: Field<Self::State, V>) -> ChildStore<Self, V>
    where
        V: Clone + Send + Sync + 'static,
    {
        ChildStore::new(self.clone(), field)
    }

    /// A copy of the current state.
    fn snapshot(&self) -> Self::State {
        self.run(|state| state.clone())
    }
}

//! Actions
//!
//! An action is a named, reusable unit of change. Where `apply` takes an
//! ad hoc closure, an action is a value that can be defined once, carry its
//! own parameters, and be dispatched from anywhere.

/// A pure transition from one state to the next.
///
/// # Example
///
/// ```rust
/// use canopy_core::{field, Action, RootStore, Store};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Counter {
///     value: i32,
/// }
///
/// struct Add(i32);
///
/// impl Action<Counter> for Add {
///     fn reduce(&self, state: &Counter) -> Counter {
///         field!(Counter, value: i32).replace(state, state.value + self.0)
///     }
/// }
///
/// let store = RootStore::new(Counter { value: 1 });
/// store.dispatch(&Add(2));
/// assert_eq!(store.snapshot().value, 3);
/// ```
pub trait Action<T> {
    /// Compute the next state. Must not have side effects.
    fn reduce(&self, state: &T) -> T;

    /// Label reported to instrumented stores.
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }
}

/// An action that may refuse to produce a next state.
///
/// The error is the consumer's own; the store hands it back to the caller of
/// `try_dispatch` untouched and keeps the previous state.
pub trait TryAction<T> {
    type Error;

    /// Compute the next state, or fail without side effects.
    fn try_reduce(&self, state: &T) -> Result<T, Self::Error>;

    /// Label reported to instrumented stores.
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }
}

/// Last path segment of a type name, without generic arguments.
fn short_type_name<A: ?Sized>() -> &'static str {
    let full = std::any::type_name::<A>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

//! Hierarchical Stores
//!
//! This module implements the state container: one root store owning a
//! state tree, and any number of child stores viewing nested slices of it.
//!
//! # Concepts
//!
//! ## Fields
//!
//! A `Field<S, V>` names one field of a record. It is the key passed to
//! `update` and the path segment a child store descends through. `update`
//! (the function) is the one place a record is copied: a shallow clone with
//! one field replaced.
//!
//! ## Actions
//!
//! An `Action` is a reusable, named transition `reduce(&state) -> state`.
//! `TryAction` is the fallible form.
//!
//! ## Root and Child Stores
//!
//! A `RootStore` owns the authoritative value and broadcasts each new value
//! to its listeners. A `ChildStore` owns nothing: it turns every operation
//! into a read-modify-write round trip through its parent. Both implement
//! `Store`, so code written against a store does not know how deep in the
//! tree it sits.
//!
//! ## Selections
//!
//! `select`, `select_field` and `select_with` return a `Selection`, a
//! replay-latest sequence that delivers the current value on subscribe and
//! (for the projecting forms) only values that differ from the previous one.

mod action;
mod child;
mod contract;
mod field;
mod root;
mod selection;

pub use action::{Action, TryAction};
pub use child::ChildStore;
pub use contract::Store;
pub use field::{update, Field};
pub use root::RootStore;
pub use selection::{Selection, SubscriberId, Subscription};

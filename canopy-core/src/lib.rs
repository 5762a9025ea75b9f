//! Canopy Core
//!
//! This crate provides a hierarchical reactive state container: one root
//! store owns an immutable state tree, and any number of child stores read
//! and write nested slices of it without knowing the tree's overall shape.
//! It implements:
//!
//! - Immutable updates (every transition produces a new state value)
//! - Selective subscription (observers are notified only when the slice
//!   they selected actually changes)
//! - Child stores that expose the root's contract at any depth by delegating
//!   every mutation back up through their ancestors
//! - Instrumented stores for logging and for external state inspectors
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `store`: fields, actions, the `Store` contract, root and child stores
//! - `instrument`: logging and devtools decorators
//! - `provision`: configuration-driven store construction
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use canopy_core::{field, RootStore, Store};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct TextState {
//!     text: String,
//! }
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct AppState {
//!     value: i32,
//!     text_state: Arc<TextState>,
//! }
//!
//! let text_state = field!(AppState, text_state: Arc<TextState>);
//! let text = field!(Arc<TextState>, text: String);
//!
//! let root = RootStore::new(AppState {
//!     value: 0,
//!     text_state: Arc::new(TextState { text: "foo".into() }),
//! });
//!
//! // A component that only knows about `TextState`.
//! let texts = root.child(text_state);
//! let _subscription = texts.select_field(&text).subscribe(|t| println!("text = {t}"));
//! texts.update(&text, "bar".to_string());
//!
//! assert_eq!(root.snapshot().text_state.text, "bar");
//! ```

pub mod error;
pub mod instrument;
pub mod provision;
pub mod store;

pub use error::{Result, StoreError};
pub use instrument::{DevtoolsConnection, DevtoolsStore, LoggingStore, LoopbackConnection};
pub use provision::{create_child_store, create_store, AnyStore, StoreConfig, StoreKind};
pub use store::{
    update, Action, ChildStore, Field, RootStore, Selection, Store, SubscriberId, Subscription,
    TryAction,
};

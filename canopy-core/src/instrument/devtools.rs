//! Devtools Bridge
//!
//! Connects a root store to an external state inspector that speaks the
//! Redux DevTools message protocol.
//!
//! # Outbound
//!
//! - On construction: `init(state)`.
//! - After every committed mutation: `send(label, state)`.
//!
//! # Inbound
//!
//! The inspector sends JSON messages. A jump command restores a recorded
//! state:
//!
//! ```json
//! {"type": "DISPATCH", "payload": {"type": "JUMP_TO_STATE"}, "state": "{\"value\":3}"}
//! ```
//!
//! `state` is itself JSON text. It is parsed into the store's state type and
//! force-set on the root store, which broadcasts it like any other
//! mutation. Every other message is logged and ignored. A message that
//! cannot be parsed, or whose state does not fit the store, is rejected
//! without touching the store.
//!
//! The connection is always injected by the caller; there is no global
//! inspector handle.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::store::{RootStore, Selection, Store};

/// Callback receiving raw inbound messages from the inspector.
pub type InboundListener = Box<dyn Fn(&str) + Send + Sync>;

/// A channel to an external state inspector.
pub trait DevtoolsConnection: Send + Sync {
    /// Announce the store's initial state.
    fn init(&self, state: &Value);

    /// Report a committed mutation and the state it produced.
    fn send(&self, label: &str, state: &Value);

    /// Register a listener for messages coming back from the inspector.
    fn subscribe(&self, listener: InboundListener);
}

/// Top-level message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Start,
    Stop,
    Action,
    Dispatch,
    #[serde(other)]
    Other,
}

/// Command carried by a `DISPATCH` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadKind {
    JumpToState,
    JumpToAction,
    Reset,
    Commit,
    Rollback,
    #[serde(other)]
    Other,
}

/// Payload of a `DISPATCH` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
}

/// A message received from the inspector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevtoolsMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePayload>,
    /// Serialized state, for jump commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl DevtoolsMessage {
    /// Parse a message from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(StoreError::MalformedMessage)
    }

    /// Serialize the message to JSON text.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(StoreError::Serialize)
    }

    /// Build a jump command that restores `state`.
    pub fn jump_to_state<T: Serialize>(state: &T) -> Result<Self> {
        let state = serde_json::to_string(state).map_err(StoreError::Serialize)?;
        Ok(Self {
            kind: MessageKind::Dispatch,
            payload: Some(MessagePayload {
                kind: PayloadKind::JumpToState,
            }),
            state: Some(state),
        })
    }

    /// Whether this message asks the store to jump to a recorded state.
    pub fn is_jump(&self) -> bool {
        self.kind == MessageKind::Dispatch
            && matches!(
                self.payload.as_ref().map(|payload| payload.kind),
                Some(PayloadKind::JumpToState | PayloadKind::JumpToAction)
            )
    }

    /// The state text to jump to, or `None` if this is not a jump command.
    pub fn jump_state(&self) -> Result<Option<&str>> {
        if !self.is_jump() {
            return Ok(None);
        }
        self.state
            .as_deref()
            .map(Some)
            .ok_or(StoreError::MissingJumpState)
    }
}

/// A root store whose mutations are mirrored to a state inspector.
pub struct DevtoolsStore<T> {
    root: RootStore<T>,
    connection: Arc<dyn DevtoolsConnection>,
}

impl<T> DevtoolsStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a root store holding `initial` and connect it.
    pub fn new(initial: T, connection: Arc<dyn DevtoolsConnection>) -> Result<Self> {
        Self::wrap(RootStore::new(initial), connection)
    }

    /// Connect an existing root store.
    ///
    /// Sends the current state as the inspector's initial state and starts
    /// listening for jump commands.
    pub fn wrap(root: RootStore<T>, connection: Arc<dyn DevtoolsConnection>) -> Result<Self> {
        let state = root
            .run(|state| serde_json::to_value(state))
            .map_err(StoreError::Serialize)?;
        connection.init(&state);

        let inbound = root.clone();
        connection.subscribe(Box::new(move |raw: &str| {
            // Failures are logged by `receive`; there is no caller to return them to.
            let _ = receive(&inbound, raw);
        }));

        tracing::debug!("devtools bridge connected");
        Ok(Self { root, connection })
    }

    /// Process one inbound message.
    ///
    /// Returns `Ok(true)` if the message restored a state, `Ok(false)` if it
    /// was ignored.
    pub fn handle_message(&self, raw: &str) -> Result<bool> {
        receive(&self.root, raw)
    }

    /// The wrapped root store.
    pub fn root(&self) -> &RootStore<T> {
        &self.root
    }

    fn report(&self, label: &str) {
        self.root.run(|state| match serde_json::to_value(state) {
            Ok(value) => self.connection.send(label, &value),
            Err(err) => {
                tracing::warn!(label, error = %err, "state not serializable, devtools not notified")
            }
        });
    }
}

fn receive<T>(root: &RootStore<T>, raw: &str) -> Result<bool>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let outcome = DevtoolsMessage::from_json(raw).and_then(|message| {
        let Some(state) = message.jump_state()? else {
            tracing::debug!(kind = ?message.kind, "ignoring devtools message");
            return Ok(None);
        };
        serde_json::from_str::<T>(state)
            .map(Some)
            .map_err(StoreError::InvalidState)
    });

    match outcome {
        Ok(Some(state)) => {
            root.force_set(state);
            Ok(true)
        }
        Ok(None) => Ok(false),
        Err(err) => {
            tracing::warn!(error = %err, "rejected devtools message, state unchanged");
            Err(err)
        }
    }
}

impl<T> Store for DevtoolsStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    type State = T;

    fn run<R, F>(&self, task: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.root.run(task)
    }

    fn try_apply_as<E, F>(&self, label: &str, reducer: F) -> std::result::Result<(), E>
    where
        F: FnOnce(&T) -> std::result::Result<T, E>,
    {
        self.root.run(|_| {
            self.root.try_apply_as(label, reducer)?;
            self.report(label);
            Ok(())
        })
    }

    fn select(&self) -> Selection<T> {
        self.root.select()
    }
}

impl<T> Clone for DevtoolsStore<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            connection: Arc::clone(&self.connection),
        }
    }
}

impl<T> std::fmt::Debug for DevtoolsStore<T>
where
    T: Clone + std::fmt::Debug + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevtoolsStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// An in-process connection that records outbound traffic.
///
/// Useful for hosts without an external inspector and for tests: inspect
/// what was sent with `initial_state` and `sent`, and feed inbound messages
/// with `deliver`.
#[derive(Default)]
pub struct LoopbackConnection {
    initial: Mutex<Option<Value>>,
    sent: Mutex<Vec<(String, Value)>>,
    listeners: Mutex<Vec<Arc<dyn Fn(&str) + Send + Sync>>>,
}

impl LoopbackConnection {
    /// Create a connection with no recorded sends and no handler.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The state announced by `init`, if any.
    pub fn initial_state(&self) -> Option<Value> {
        self.initial.lock().clone()
    }

    /// Every `(label, state)` reported so far, oldest first.
    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().clone()
    }

    /// Hand an inbound message to every registered listener.
    pub fn deliver(&self, raw: &str) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(raw);
        }
    }
}

impl DevtoolsConnection for LoopbackConnection {
    fn init(&self, state: &Value) {
        *self.initial.lock() = Some(state.clone());
    }

    fn send(&self, label: &str, state: &Value) {
        self.sent.lock().push((label.to_string(), state.clone()));
    }

    fn subscribe(&self, listener: InboundListener) {
        self.listeners.lock().push(Arc::from(listener));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: i32,
    }

    fn connected(value: i32) -> (DevtoolsStore<Counter>, Arc<LoopbackConnection>) {
        let connection = LoopbackConnection::new();
        let store = DevtoolsStore::new(Counter { value }, connection.clone())
            .expect("counter serializes");
        (store, connection)
    }

    #[test]
    fn init_announces_initial_state() {
        let (_store, connection) = connected(4);
        assert_eq!(connection.initial_state(), Some(json!({"value": 4})));
    }

    #[test]
    fn mutations_are_sent_with_labels() {
        let value = field!(Counter, value: i32);
        let (store, connection) = connected(0);

        store.update(&value, 1);
        store.apply_as("double", |state| value.replace(state, state.value * 2));

        assert_eq!(
            connection.sent(),
            vec![
                ("update value".to_string(), json!({"value": 1})),
                ("double".to_string(), json!({"value": 2})),
            ]
        );
    }

    #[test]
    fn failed_mutation_is_not_sent() {
        let (store, connection) = connected(0);
        let result: std::result::Result<(), &str> = store.try_apply(|_| Err("nope"));

        assert_eq!(result, Err("nope"));
        assert!(connection.sent().is_empty());
    }

    #[test]
    fn jump_to_state_force_sets_and_broadcasts() {
        let value = field!(Counter, value: i32);
        let (store, connection) = connected(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let _sub = store.select_field(&value).subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let jump = DevtoolsMessage::jump_to_state(&Counter { value: 9 })
            .and_then(|message| message.to_json())
            .expect("jump serializes");
        connection.deliver(&jump);

        assert_eq!(store.snapshot(), Counter { value: 9 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(connection.sent().is_empty());
    }

    #[test]
    fn jump_to_same_value_is_deduplicated() {
        let value = field!(Counter, value: i32);
        let (store, _connection) = connected(5);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let _sub = store.select_field(&value).subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let raw = r#"{"type":"DISPATCH","payload":{"type":"JUMP_TO_ACTION"},"state":"{\"value\":5}"}"#;
        assert!(store.handle_message(raw).expect("valid jump"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn other_messages_are_ignored() {
        let (store, _connection) = connected(1);

        assert!(!store.handle_message(r#"{"type":"START"}"#).expect("start parses"));
        assert!(!store
            .handle_message(r#"{"type":"DISPATCH","payload":{"type":"TOGGLE_ACTION"}}"#)
            .expect("toggle parses"));
        assert!(!store.handle_message(r#"{"type":"SOMETHING_NEW"}"#).expect("unknown parses"));
        assert_eq!(store.snapshot(), Counter { value: 1 });
    }

    #[test]
    fn malformed_messages_leave_state_alone() {
        let (store, connection) = connected(1);

        assert!(matches!(
            store.handle_message("not json"),
            Err(StoreError::MalformedMessage(_))
        ));
        assert!(matches!(
            store.handle_message(r#"{"type":"DISPATCH","payload":{"type":"JUMP_TO_STATE"}}"#),
            Err(StoreError::MissingJumpState)
        ));
        assert!(matches!(
            store.handle_message(
                r#"{"type":"DISPATCH","payload":{"type":"JUMP_TO_STATE"},"state":"{\"count\":2}"}"#
            ),
            Err(StoreError::InvalidState(_))
        ));

        connection.deliver("{also not json");
        assert_eq!(store.snapshot(), Counter { value: 1 });
    }

    #[test]
    fn child_mutations_reach_the_inspector() {
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        struct App {
            counter: Arc<Counter>,
        }

        let counter = field!(App, counter: Arc<Counter>);
        let value = field!(Arc<Counter>, value: i32);
        let connection = LoopbackConnection::new();
        let store = DevtoolsStore::new(
            App {
                counter: Arc::new(Counter { value: 0 }),
            },
            connection.clone(),
        )
        .expect("app serializes");

        store.child(counter).update(&value, 8);

        assert_eq!(
            connection.sent(),
            vec![(
                "counter > update value".to_string(),
                json!({"counter": {"value": 8}})
            )]
        );
    }
}

//! Selections and Subscriptions
//!
//! A `Selection<U>` is a subscribable sequence of values projected out of a
//! store. It does no work until subscribed: each `subscribe` call walks the
//! chain of projections back to the root store and registers one listener
//! there.
//!
//! # Delivery
//!
//! - A new listener immediately receives the current value (replay latest).
//! - Every later broadcast is delivered synchronously, in subscription order.
//! - `distinct` (and the `select_*` helpers built on it) drops a value equal
//!   to the one this subscription saw last. The memory of the last value is
//!   per subscription, not shared between subscribers.
//!
//! # Lifetime
//!
//! `subscribe` returns a `Subscription`. Dropping it detaches the listener
//! from the root store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::field::Field;

/// Unique identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback invoked with each delivered value.
pub(crate) type Listener<U> = Arc<dyn Fn(&U) + Send + Sync>;

type Attach<U> = dyn Fn(Listener<U>) -> Subscription + Send + Sync;

/// Something listeners can be detached from.
pub(crate) trait Detach: Send + Sync {
    fn detach(&self, id: SubscriberId);
}

/// Handle to a registered listener.
///
/// Dropping the handle unregisters the listener.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    id: SubscriberId,
    source: Weak<dyn Detach>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, source: Weak<dyn Detach>) -> Self {
        Self { id, source }
    }

    /// The listener's ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Stop observing. Equivalent to dropping the handle.
    ///
    /// Takes effect immediately, including for a broadcast already in
    /// progress: a listener detached by an earlier listener is skipped.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(source) = self.source.upgrade() {
            source.detach(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// A subscribable, replay-latest sequence of values.
pub struct Selection<U> {
    attach: Arc<Attach<U>>,
}

impl<U: 'static> Selection<U> {
    pub(crate) fn from_source<F>(attach: F) -> Self
    where
        F: Fn(Listener<U>) -> Subscription + Send + Sync + 'static,
    {
        Self {
            attach: Arc::new(attach),
        }
    }

    /// Register a listener.
    ///
    /// The listener is called once with the current value before this
    /// returns, then again for every later value.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&U) + Send + Sync + 'static,
    {
        (self.attach)(Arc::new(listener))
    }

    /// Project every value through `f`, without deduplication.
    pub fn map<W, F>(&self, f: F) -> Selection<W>
    where
        W: 'static,
        F: Fn(&U) -> W + Send + Sync + 'static,
    {
        let source = Arc::clone(&self.attach);
        let f = Arc::new(f);
        Selection::from_source(move |listener: Listener<W>| {
            let f = Arc::clone(&f);
            source(Arc::new(move |value: &U| listener(&f(value))))
        })
    }

    /// Suppress values equal to the one delivered just before.
    pub fn distinct(&self) -> Selection<U>
    where
        U: Clone + PartialEq + Send,
    {
        let source = Arc::clone(&self.attach);
        Selection::from_source(move |listener: Listener<U>| {
            let last: Mutex<Option<U>> = Mutex::new(None);
            source(Arc::new(move |value: &U| {
                {
                    let mut last = last.lock();
                    if last.as_ref() == Some(value) {
                        return;
                    }
                    *last = Some(value.clone());
                }
                listener(value);
            }))
        })
    }

    /// Project one field, deduplicated.
    pub fn select_field<W>(&self, field: &Field<U, W>) -> Selection<W>
    where
        W: Clone + PartialEq + Send + 'static,
    {
        let field = *field;
        self.map(move |value| field.get(value).clone()).distinct()
    }

    /// Project through a selector, deduplicated.
    pub fn select_with<W, F>(&self, selector: F) -> Selection<W>
    where
        W: Clone + PartialEq + Send + 'static,
        F: Fn(&U) -> W + Send + Sync + 'static,
    {
        self.map(selector).distinct()
    }

    /// The value a new subscriber would receive right now.
    pub fn latest(&self) -> Option<U>
    where
        U: Clone + Send,
    {
        let slot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        let subscription = self.subscribe(move |value: &U| {
            *sink.lock() = Some(value.clone());
        });
        drop(subscription);
        let latest = slot.lock().take();
        latest
    }
}

impl<U> Clone for Selection<U> {
    fn clone(&self) -> Self {
        Self {
            attach: Arc::clone(&self.attach),
        }
    }
}

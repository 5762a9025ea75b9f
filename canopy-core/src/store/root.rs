//! Root Store
//!
//! The root store owns the one authoritative value of a state tree and the
//! registry of listeners observing it.
//!
//! # How Mutations Work
//!
//! 1. Enter the store's mutation region.
//! 2. Compute the next value from the current one. Nothing has been written
//!    yet, so a failing (or panicking) reducer leaves the store untouched.
//! 3. Swap the next value in.
//! 4. Broadcast it to every listener, in subscription order.
//!
//! A listener that writes back into the store during a broadcast does not
//! interrupt it. The nested commit is queued and delivered once every
//! listener has seen the value being broadcast, so all listeners observe
//! commits in the order they happened and end on the current value.
//!
//! # Thread Safety
//!
//! The mutation region is a `parking_lot::ReentrantMutex`. `run`, every
//! mutation, and subscription all execute inside it, so a read followed by
//! a write issued from within `run` cannot interleave with a mutation from
//! another thread. The lock is reentrant so that the same thread can write
//! from inside `run` (this is how child stores update their slice) and so
//! that listeners can call back into the store.
//!
//! `parking_lot` locks do not poison: a reducer that panics unwinds out of
//! the region and the previous value stays current.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex};
use smallvec::SmallVec;

use super::contract::Store;
use super::selection::{Detach, Listener, Selection, SubscriberId, Subscription};

/// The single owner of a state tree.
///
/// Cloning a `RootStore` yields another handle to the same tree.
///
/// # Example
///
/// ```rust
/// use canopy_core::{field, RootStore, Store};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Counter {
///     value: i32,
/// }
///
/// let value = field!(Counter, value: i32);
/// let store = RootStore::new(Counter { value: 0 });
///
/// let subscription = store.select_field(&value).subscribe(|v| println!("value = {v}"));
/// store.update(&value, 5);
/// store.apply(|state| value.replace(state, state.value + 1));
///
/// assert_eq!(store.snapshot(), Counter { value: 6 });
/// drop(subscription);
/// ```
pub struct RootStore<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    /// The mutation region.
    region: ReentrantMutex<Region<T>>,

    /// Registered listeners, in subscription order.
    listeners: Mutex<IndexMap<SubscriberId, Listener<T>>>,
}

/// Everything guarded by the mutation region.
struct Region<T> {
    /// The current value.
    state: RefCell<Arc<T>>,

    /// Committed values not yet delivered, oldest first.
    pending: RefCell<VecDeque<Arc<T>>>,

    /// Set while a broadcast is draining `pending`.
    broadcasting: Cell<bool>,
}

impl<T> Region<T> {
    fn current(&self) -> Arc<T> {
        Arc::clone(&self.state.borrow())
    }
}

/// Clears the broadcast flag even if a listener panics.
struct Draining<'a, T>(&'a Region<T>);

impl<T> Drop for Draining<'_, T> {
    fn drop(&mut self) {
        self.0.pending.borrow_mut().clear();
        self.0.broadcasting.set(false);
    }
}

impl<T> Shared<T> {
    /// Swap `next` in and deliver it. Must be called inside the region.
    fn commit(&self, region: &Region<T>, next: T) {
        let next = Arc::new(next);
        *region.state.borrow_mut() = Arc::clone(&next);
        region.pending.borrow_mut().push_back(next);

        // A commit made by a listener is picked up by the outer drain.
        if region.broadcasting.replace(true) {
            return;
        }

        let _draining = Draining(region);
        loop {
            let Some(state) = region.pending.borrow_mut().pop_front() else {
                break;
            };
            self.broadcast(&state);
        }
    }

    fn broadcast(&self, state: &T) {
        // Snapshot the registry so listeners can subscribe or unsubscribe
        // while being notified.
        let listeners: SmallVec<[(SubscriberId, Listener<T>); 4]> = self
            .listeners
            .lock()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in listeners {
            // Skip listeners detached by an earlier listener of this broadcast.
            if !self.listeners.lock().contains_key(&id) {
                continue;
            }
            listener(state);
        }
    }
}

impl<T: Send + Sync> Detach for Shared<T> {
    fn detach(&self, id: SubscriberId) {
        self.listeners.lock().shift_remove(&id);
    }
}

impl<T> RootStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a store holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                region: ReentrantMutex::new(Region {
                    state: RefCell::new(Arc::new(initial)),
                    pending: RefCell::new(VecDeque::new()),
                    broadcasting: Cell::new(false),
                }),
                listeners: Mutex::new(IndexMap::new()),
            }),
        }
    }

    /// Replace the state wholesale and broadcast it.
    ///
    /// This bypasses actions and reducers; it exists for external inspection
    /// tools that restore a recorded state.
    pub fn force_set(&self, state: T) {
        let region = self.shared.region.lock();
        self.shared.commit(&region, state);
        tracing::debug!("state force-set");
    }

    /// Number of listeners currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }

    fn attach(shared: &Arc<Shared<T>>, listener: Listener<T>) -> Subscription {
        let region = shared.region.lock();
        let current = region.current();

        let id = SubscriberId::new();
        shared.listeners.lock().insert(id, Arc::clone(&listener));
        listener(&current);
        drop(region);

        let source: Weak<dyn Detach> = Arc::downgrade(shared) as Weak<dyn Detach>;
        Subscription::new(id, source)
    }
}

impl<T> Store for RootStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    type State = T;

    fn run<R, F>(&self, task: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let region = self.shared.region.lock();
        // Release the borrow before calling out, the task may write back.
        let current = region.current();
        task(&current)
    }

    fn try_apply_as<E, F>(&self, label: &str, reducer: F) -> Result<(), E>
    where
        F: FnOnce(&T) -> Result<T, E>,
    {
        let region = self.shared.region.lock();
        let current = region.current();

        let next = reducer(&current)?;
        self.shared.commit(&region, next);
        tracing::trace!(label, subscribers = self.subscriber_count(), "state committed");
        Ok(())
    }

    fn select(&self) -> Selection<T> {
        let shared = Arc::clone(&self.shared);
        Selection::from_source(move |listener| Self::attach(&shared, listener))
    }
}

impl<T> Clone for RootStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for RootStore<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for RootStore<T>
where
    T: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootStore")
            .field("state", &self.snapshot())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

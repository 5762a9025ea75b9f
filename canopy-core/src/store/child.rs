//! Child Store
//!
//! A child store is a view over one field of its parent's state. It holds no
//! state of its own, only a handle to the parent and the `Field` naming its
//! slice, and it offers the same `Store` contract as the root.
//!
//! # How Delegation Works
//!
//! Every operation is a round trip through the parent:
//!
//! - reads: `parent.run(|p| task(field.get(p)))`
//! - writes: `parent.run(|p| parent.update(field, reducer(field.get(p))))`
//! - selections: `parent.select_field(field)`, projected further as asked
//!
//! Because the parent may itself be a child store, the chain recurses until
//! it reaches a root store, one hop per level. The root's `run` holds its
//! mutation region across the whole round trip, so the new slice is always
//! computed against the value it replaces.
//!
//! A child mutation reaches its parent labelled `"<field> > <label>"`, so an
//! instrumented root sees the whole path, e.g. `textState > update text`.

use std::fmt;

use super::contract::Store;
use super::field::Field;
use super::selection::Selection;

/// A store over the slice of `P`'s state held in one field.
pub struct ChildStore<P: Store, V> {
    parent: P,
    field: Field<P::State, V>,
}

impl<P, V> ChildStore<P, V>
where
    P: Store,
    V: Clone + Send + Sync + 'static,
{
    /// Create a view over `field` of `parent`'s state.
    ///
    /// Nothing is read or written; a child store is free to create and drop.
    pub fn new(parent: P, field: Field<P::State, V>) -> Self {
        tracing::trace!(field = field.name(), "child store created");
        Self { parent, field }
    }

    /// The store this one delegates to.
    pub fn parent(&self) -> &P {
        &self.parent
    }

    /// The field naming this store's slice.
    pub fn field(&self) -> Field<P::State, V> {
        self.field
    }
}

impl<P, V> Store for ChildStore<P, V>
where
    P: Store,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    type State = V;

    fn run<R, F>(&self, task: F) -> R
    where
        F: FnOnce(&V) -> R,
    {
        let field = self.field;
        self.parent.run(|parent_state| task(field.get(parent_state)))
    }

    fn try_apply_as<E, F>(&self, label: &str, reducer: F) -> Result<(), E>
    where
        F: FnOnce(&V) -> Result<V, E>,
    {
        let field = self.field;
        self.parent.run(|parent_state| {
            let next = reducer(field.get(parent_state))?;
            let label = format!("{} > {}", field.name(), label);
            self.parent.update_as(&label, &field, next);
            Ok(())
        })
    }

    fn select(&self) -> Selection<V> {
        self.parent.select_field(&self.field)
    }
}

impl<P: Store, V> Clone for ChildStore<P, V> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            field: self.field,
        }
    }
}

impl<P, V> fmt::Debug for ChildStore<P, V>
where
    P: Store + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildStore")
            .field("field", &self.field.name())
            .field("parent", &self.parent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;
    use crate::store::{Action, RootStore};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    struct Text2State {
        text2: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct TextState {
        text: String,
        text2_state: Arc<Text2State>,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct KioskState {
        value: i32,
        text_state: Arc<TextState>,
    }

    fn kiosk() -> KioskState {
        KioskState {
            value: 0,
            text_state: Arc::new(TextState {
                text: "foo".to_string(),
                text2_state: Arc::new(Text2State {
                    text2: "bar".to_string(),
                }),
            }),
        }
    }

    fn text_state() -> Field<KioskState, Arc<TextState>> {
        field!(KioskState, text_state: Arc<TextState>)
    }

    fn text() -> Field<Arc<TextState>, String> {
        field!(Arc<TextState>, text: String)
    }

    fn text2_state() -> Field<Arc<TextState>, Arc<Text2State>> {
        field!(Arc<TextState>, text2_state: Arc<Text2State>)
    }

    fn text2() -> Field<Arc<Text2State>, String> {
        field!(Arc<Text2State>, text2: String)
    }

    struct Shout;

    impl Action<Arc<TextState>> for Shout {
        fn reduce(&self, state: &Arc<TextState>) -> Arc<TextState> {
            let text = field!(Arc<TextState>, text: String);
            text.replace(state, state.text.to_uppercase())
        }
    }

    #[test]
    fn child_update_writes_through_to_root() {
        let root = RootStore::new(kiosk());
        root.child(text_state()).update(&text(), "baz".to_string());

        let state = root.snapshot();
        assert_eq!(state.value, 0);
        assert_eq!(state.text_state.text, "baz");
        assert_eq!(state.text_state.text2_state.text2, "bar");
    }

    #[test]
    fn child_run_sees_its_slice() {
        let root = RootStore::new(kiosk());
        let child = root.child(text_state());

        assert_eq!(child.run(|slice| slice.text.clone()), "foo");
        assert_eq!(child.snapshot().text, "foo");
    }

    #[test]
    fn child_dispatch_and_apply() {
        let root = RootStore::new(kiosk());
        let child = root.child(text_state());

        child.dispatch(&Shout);
        assert_eq!(root.snapshot().text_state.text, "FOO");

        child.apply(|slice| text().replace(slice, format!("{}!", slice.text)));
        assert_eq!(root.snapshot().text_state.text, "FOO!");
    }

    #[test]
    fn child_try_apply_failure_leaves_root_untouched() {
        let root = RootStore::new(kiosk());
        let child = root.child(text_state());

        let result: Result<(), &str> = child.try_apply(|_| Err("no"));

        assert_eq!(result, Err("no"));
        assert_eq!(root.snapshot(), kiosk());
    }

    #[test]
    fn grandchild_shares_untouched_branches() {
        let root = RootStore::new(kiosk());
        let before = root.snapshot();

        root.child(text_state())
            .child(text2_state())
            .update(&text2(), "qux".to_string());

        let after = root.snapshot();
        assert_eq!(after.text_state.text2_state.text2, "qux");
        assert_eq!(after.text_state.text, "foo");
        assert_eq!(before.text_state.text2_state.text2, "bar");
        assert!(!Arc::ptr_eq(&before.text_state, &after.text_state));
    }

    #[test]
    fn child_selection_ignores_sibling_changes() {
        let root = RootStore::new(kiosk());
        let child = root.child(text_state());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let _sub = child.select_field(&text()).subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        root.update(&field!(KioskState, value: i32), 9);
        child.child(text2_state()).update(&text2(), "other".to_string());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        child.update(&text(), "changed".to_string());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn child_select_with_projects_the_slice() {
        let root = RootStore::new(kiosk());
        let lengths = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lengths);

        let _sub = root
            .child(text_state())
            .select_with(|slice: &Arc<TextState>| slice.text.len())
            .subscribe(move |len| sink.lock().push(*len));

        root.child(text_state()).update(&text(), "abc".to_string());
        root.child(text_state()).update(&text(), "four".to_string());

        assert_eq!(*lengths.lock(), vec![3, 4]);
    }

    #[test]
    fn child_labels_carry_the_field_path() {
        #[derive(Clone)]
        struct Recorder {
            inner: RootStore<KioskState>,
            labels: Arc<Mutex<Vec<String>>>,
        }

        impl Store for Recorder {
            type State = KioskState;

            fn run<R, F>(&self, task: F) -> R
            where
                F: FnOnce(&KioskState) -> R,
            {
                self.inner.run(task)
            }

            fn try_apply_as<E, F>(&self, label: &str, reducer: F) -> Result<(), E>
            where
                F: FnOnce(&KioskState) -> Result<KioskState, E>,
            {
                self.labels.lock().push(label.to_string());
                self.inner.try_apply_as(label, reducer)
            }

            fn select(&self) -> Selection<KioskState> {
                self.inner.select()
            }
        }

        let recorder = Recorder {
            inner: RootStore::new(kiosk()),
            labels: Arc::new(Mutex::new(Vec::new())),
        };

        let child = recorder.child(text_state());
        child.update(&text(), "x".to_string());
        child.dispatch(&Shout);
        child.child(text2_state()).update(&text2(), "y".to_string());

        assert_eq!(
            *recorder.labels.lock(),
            vec![
                "text_state > update text".to_string(),
                "text_state > Shout".to_string(),
                "text_state > text2_state > update text2".to_string(),
            ]
        );
    }

    #[test]
    fn concurrent_child_writers_do_not_lose_updates() {
        #[derive(Clone, Debug, PartialEq)]
        struct Tally {
            hits: u32,
        }

        #[derive(Clone, Debug, PartialEq)]
        struct App {
            tally: Arc<Tally>,
            name: &'static str,
        }

        let tally = field!(App, tally: Arc<Tally>);
        let hits = field!(Arc<Tally>, hits: u32);
        let root = RootStore::new(App {
            tally: Arc::new(Tally { hits: 0 }),
            name: "app",
        });

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let child = root.child(tally);
                scope.spawn(move || {
                    for _ in 0..200 {
                        child.apply(|slice| hits.replace(slice, slice.hits + 1));
                    }
                });
            }
        });

        assert_eq!(root.snapshot().tally.hits, 800);
        assert_eq!(root.snapshot().name, "app");
    }
}

//! Store Provisioning
//!
//! Factories used by whatever layer owns the application's wiring. The root
//! factory picks a store variant from configuration; the feature factory
//! seeds a slice of an existing store and hands back a child store over it.
//!
//! # Configuration
//!
//! The variant is a `StoreKind`, read from JSON, from a string, or from the
//! `CANOPY_STORE_KIND` environment variable:
//!
//! ```rust
//! use canopy_core::provision::{StoreConfig, StoreKind};
//!
//! let config = StoreConfig::from_json(r#"{"kind": "debug"}"#).unwrap();
//! assert_eq!(config.kind, StoreKind::Debug);
//! assert_eq!("devtools".parse::<StoreKind>().unwrap(), StoreKind::Devtools);
//! ```

use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::instrument::{DevtoolsConnection, DevtoolsStore, LoggingStore};
use crate::store::{ChildStore, Field, RootStore, Selection, Store};

/// Which store variant to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// A plain root store.
    #[default]
    Standard,
    /// A root store that logs every mutation.
    Debug,
    /// A root store mirrored to a devtools connection.
    Devtools,
}

impl StoreKind {
    /// The lowercase name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Standard => "standard",
            StoreKind::Debug => "debug",
            StoreKind::Devtools => "devtools",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(StoreKind::Standard),
            "debug" => Ok(StoreKind::Debug),
            "devtools" => Ok(StoreKind::Devtools),
            _ => Err(StoreError::UnknownStoreKind(s.to_string())),
        }
    }
}

/// Construction-time settings for a root store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
}

impl StoreConfig {
    /// Environment variable consulted by `from_env`.
    pub const KIND_ENV: &'static str = "CANOPY_STORE_KIND";

    /// Settings selecting `kind`.
    pub fn new(kind: StoreKind) -> Self {
        Self { kind }
    }

    /// Parse settings from JSON text. Missing keys take their defaults.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read settings from the environment.
    ///
    /// An unset variable selects the standard store; a set but unknown value
    /// is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_env_value(std::env::var_os(Self::KIND_ENV))
    }

    fn from_env_value(raw: Option<OsString>) -> Result<Self> {
        match raw {
            Some(raw) => Ok(Self::new(raw.to_string_lossy().parse()?)),
            None => Ok(Self::default()),
        }
    }
}

/// A root store of whichever variant the configuration selected.
pub enum AnyStore<T> {
    Standard(RootStore<T>),
    Debug(LoggingStore<RootStore<T>>),
    Devtools(DevtoolsStore<T>),
}

impl<T> AnyStore<T>
where
    T: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// The variant this store was built as.
    pub fn kind(&self) -> StoreKind {
        match self {
            AnyStore::Standard(_) => StoreKind::Standard,
            AnyStore::Debug(_) => StoreKind::Debug,
            AnyStore::Devtools(_) => StoreKind::Devtools,
        }
    }

    /// The root store underneath any instrumentation.
    pub fn root(&self) -> &RootStore<T> {
        match self {
            AnyStore::Standard(store) => store,
            AnyStore::Debug(store) => store.inner(),
            AnyStore::Devtools(store) => store.root(),
        }
    }
}

impl<T> Store for AnyStore<T>
where
    T: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type State = T;

    fn run<R, F>(&self, task: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        match self {
            AnyStore::Standard(store) => store.run(task),
            AnyStore::Debug(store) => store.run(task),
            AnyStore::Devtools(store) => store.run(task),
        }
    }

    fn try_apply_as<E, F>(&self, label: &str, reducer: F) -> std::result::Result<(), E>
    where
        F: FnOnce(&T) -> std::result::Result<T, E>,
    {
        match self {
            AnyStore::Standard(store) => store.try_apply_as(label, reducer),
            AnyStore::Debug(store) => store.try_apply_as(label, reducer),
            AnyStore::Devtools(store) => store.try_apply_as(label, reducer),
        }
    }

    fn select(&self) -> Selection<T> {
        match self {
            AnyStore::Standard(store) => store.select(),
            AnyStore::Debug(store) => store.select(),
            AnyStore::Devtools(store) => store.select(),
        }
    }
}

impl<T> Clone for AnyStore<T> {
    fn clone(&self) -> Self {
        match self {
            AnyStore::Standard(store) => AnyStore::Standard(store.clone()),
            AnyStore::Debug(store) => AnyStore::Debug(store.clone()),
            AnyStore::Devtools(store) => AnyStore::Devtools(store.clone()),
        }
    }
}

/// Build the root store selected by `config`.
///
/// `connection` is only used by the devtools variant, which fails with
/// `StoreError::MissingConnection` without one.
pub fn create_store<T>(
    initial: T,
    config: &StoreConfig,
    connection: Option<Arc<dyn DevtoolsConnection>>,
) -> Result<AnyStore<T>>
where
    T: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    tracing::debug!(kind = %config.kind, "creating store");
    let store = match config.kind {
        StoreKind::Standard => AnyStore::Standard(RootStore::new(initial)),
        StoreKind::Debug => AnyStore::Debug(LoggingStore::new(RootStore::new(initial))),
        StoreKind::Devtools => {
            let connection = connection.ok_or(StoreError::MissingConnection)?;
            AnyStore::Devtools(DevtoolsStore::new(initial, connection)?)
        }
    };
    Ok(store)
}

/// Seed `field` of `store` with `initial` and return a child store over it.
///
/// The seed is written with a single update, so observers of `store` see
/// one transition.
pub fn create_child_store<S, V>(store: &S, field: Field<S::State, V>, initial: V) -> ChildStore<S, V>
where
    S: Store,
    V: Clone + Send + Sync + 'static,
{
    tracing::debug!(field = field.name(), "creating child store");
    store.update_as(&format!("seed {}", field.name()), &field, initial);
    store.child(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;
    use crate::instrument::LoopbackConnection;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Feature {
        enabled: bool,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct App {
        value: i32,
        feature: Arc<Feature>,
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(" Debug ".parse::<StoreKind>().unwrap(), StoreKind::Debug);
        assert_eq!("STANDARD".parse::<StoreKind>().unwrap(), StoreKind::Standard);
        assert!(matches!(
            "verbose".parse::<StoreKind>(),
            Err(StoreError::UnknownStoreKind(name)) if name == "verbose"
        ));
    }

    #[test]
    fn kind_round_trips_through_display() {
        for kind in [StoreKind::Standard, StoreKind::Debug, StoreKind::Devtools] {
            assert_eq!(kind.to_string().parse::<StoreKind>().unwrap(), kind);
        }
    }

    #[test]
    fn config_defaults_to_standard() {
        assert_eq!(StoreConfig::from_json("{}").unwrap().kind, StoreKind::Standard);
        assert!(StoreConfig::from_json(r#"{"kind": "loud"}"#).is_err());
    }

    #[test]
    fn config_reads_environment_value() {
        let config = StoreConfig::from_env_value(Some(OsString::from("devtools")));
        assert_eq!(config.unwrap().kind, StoreKind::Devtools);

        let unset = StoreConfig::from_env_value(None);
        assert_eq!(unset.unwrap().kind, StoreKind::Standard);

        let unknown = StoreConfig::from_env_value(Some(OsString::from("verbose")));
        assert!(matches!(unknown, Err(StoreError::UnknownStoreKind(kind)) if kind == "verbose"));
    }

    #[test]
    fn create_store_builds_each_variant() {
        let standard = create_store(App::default(), &StoreConfig::new(StoreKind::Standard), None)
            .unwrap();
        let debug = create_store(App::default(), &StoreConfig::new(StoreKind::Debug), None).unwrap();
        let connection = LoopbackConnection::new();
        let devtools = create_store(
            App::default(),
            &StoreConfig::new(StoreKind::Devtools),
            Some(connection.clone() as Arc<dyn DevtoolsConnection>),
        )
        .unwrap();

        assert_eq!(standard.kind(), StoreKind::Standard);
        assert_eq!(debug.kind(), StoreKind::Debug);
        assert_eq!(devtools.kind(), StoreKind::Devtools);

        devtools.update(&field!(App, value: i32), 2);
        assert_eq!(devtools.root().snapshot().value, 2);
        assert_eq!(connection.sent().len(), 1);
    }

    #[test]
    fn devtools_without_connection_is_an_error() {
        let result = create_store(App::default(), &StoreConfig::new(StoreKind::Devtools), None);
        assert!(matches!(result, Err(StoreError::MissingConnection)));
    }

    #[test]
    fn child_store_is_seeded_in_one_transition() {
        let feature = field!(App, feature: Arc<Feature>);
        let enabled = field!(Arc<Feature>, enabled: bool);
        let root = create_store(App::default(), &StoreConfig::default(), None).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let _sub = root.select().subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let child = create_child_store(&root, feature, Arc::new(Feature { enabled: true }));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(child.select_field(&enabled).latest(), Some(true));
        assert_eq!(root.snapshot().value, 0);
    }
}

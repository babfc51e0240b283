//! The diagnostic context attached to every captured event.

use std::thread::{self, JoinHandle};

use serde::Serialize;

use crate::{event::Mdc, guard::ContextGuard, scoped::ScopedCell};

/// Behavior switches of a [`ContextMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextMapConfig {
    /// Whether [`ContextMap::fork`] copies the forking thread's map.
    pub inherit_across_fork: bool,
    /// Whether a missing value is stored as the text `null` instead of removing the key.
    pub allow_null_values: bool,
    /// Whether [`ContextMap::copy_of_context_map`] returns `None` for a thread that never
    /// set a map.
    pub return_null_snapshot_when_unset: bool,
    /// When disabled, mutations are ignored and reads come back empty.
    pub enabled: bool,
}

impl Default for ContextMapConfig {
    fn default() -> Self {
        Self {
            inherit_across_fork: false,
            allow_null_values: true,
            return_null_snapshot_when_unset: false,
            enabled: true,
        }
    }
}

const NULL_VALUE: &str = "null";

/// A per-thread string map, the equivalent of a mapped diagnostic context.
///
/// Every event captured on a thread carries a copy of that thread's map. Threads do
/// not inherit maps implicitly; hand one over explicitly with [`ContextMap::fork`].
///
/// ```
/// use capturing_logger::{ContextMap, ContextMapConfig};
///
/// let mdc = ContextMap::new(ContextMapConfig::default());
/// mdc.put("request_id", "req-123");
///
/// let snapshot = mdc.copy_of_context_map().unwrap();
/// mdc.remove("request_id");
///
/// assert_eq!(snapshot.get("request_id").map(String::as_str), Some("req-123"));
/// assert_eq!(mdc.get("request_id"), None);
/// ```
#[derive(Debug)]
pub struct ContextMap {
    storage: ScopedCell<Option<Mdc>>,
    config: ContextMapConfig,
}

impl ContextMap {
    #[must_use]
    pub fn new(config: ContextMapConfig) -> Self {
        Self {
            storage: ScopedCell::new(|| None),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> ContextMapConfig {
        self.config
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.put_nullable(key, Some(value.into()));
    }

    /// Stores `value`, or applies the null policy when it is `None`.
    pub fn put_nullable(&self, key: impl Into<String>, value: Option<String>) {
        if !self.config.enabled {
            return;
        }
        let key = key.into();
        self.storage.with_mut(|map| {
            let map = map.get_or_insert_with(Mdc::new);
            self.store(map, key, value);
        });
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        if !self.config.enabled {
            return None;
        }
        self.storage
            .with(|map| map.as_ref().and_then(|map| map.get(key).cloned()))
    }

    pub fn remove(&self, key: &str) {
        if !self.config.enabled {
            return;
        }
        self.storage.with_mut(|map| {
            if let Some(map) = map {
                map.remove(key);
            }
        });
    }

    /// Empties the calling thread's map. The map still counts as set afterwards.
    pub fn clear(&self) {
        if self.config.enabled {
            self.storage.set(Some(Mdc::new()));
        }
    }

    /// A detached copy of the calling thread's map.
    ///
    /// Returns `None` only when the thread never set a map and
    /// [`return_null_snapshot_when_unset`](ContextMapConfig::return_null_snapshot_when_unset)
    /// is enabled.
    #[must_use]
    pub fn copy_of_context_map(&self) -> Option<Mdc> {
        let copy = if self.config.enabled {
            self.storage.get()
        } else {
            None
        };
        match copy {
            None if self.config.return_null_snapshot_when_unset => None,
            copy => Some(copy.unwrap_or_default()),
        }
    }

    /// Replaces the calling thread's map with a copy of `entries`.
    pub fn set_context_map<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_context_map_nullable(entries.into_iter().map(|(k, v)| (k, Some(v.into()))));
    }

    /// Replaces the calling thread's map, applying the null policy to `None` values.
    pub fn set_context_map_nullable<K, I>(&self, entries: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<String>)>,
    {
        if !self.config.enabled {
            return;
        }
        let mut map = Mdc::new();
        for (key, value) in entries {
            self.store(&mut map, key.into(), value);
        }
        self.storage.set(Some(map));
    }

    /// Captures what a new execution context should start with.
    ///
    /// With [`inherit_across_fork`](ContextMapConfig::inherit_across_fork) the fork holds a
    /// copy of the calling thread's map as of now; otherwise it starts unset.
    #[must_use]
    pub fn fork(&self) -> ForkedContext<'_> {
        let values = if self.config.enabled && self.config.inherit_across_fork {
            self.storage.get()
        } else {
            None
        };
        ForkedContext { map: self, values }
    }

    /// Spawns a thread that starts with a [`fork`](Self::fork) of the calling thread's map.
    pub fn spawn<F, T>(&'static self, f: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let fork = self.fork();
        thread::spawn(move || fork.run(f))
    }

    /// The map attached to events captured on the calling thread.
    pub(crate) fn snapshot(&self) -> Mdc {
        if self.config.enabled {
            self.storage.with(|map| map.clone().unwrap_or_default())
        } else {
            Mdc::new()
        }
    }

    /// Installs `values` as the calling thread's map, returning the previous one.
    pub(crate) fn install(&self, values: Option<Mdc>) -> Option<Mdc> {
        self.storage.replace(values)
    }

    /// Forgets the maps of every thread.
    pub(crate) fn clear_all_threads(&self) {
        self.storage.clear_all();
    }

    fn store(&self, map: &mut Mdc, key: String, value: Option<String>) {
        match value {
            Some(value) => {
                map.insert(key, value);
            }
            None if self.config.allow_null_values => {
                map.insert(key, NULL_VALUE.to_owned());
            }
            None => {
                map.remove(&key);
            }
        }
    }
}

impl Default for ContextMap {
    fn default() -> Self {
        Self::new(ContextMapConfig::default())
    }
}

/// A copy of a diagnostic context, waiting to be installed in another execution context.
#[derive(Debug)]
pub struct ForkedContext<'a> {
    pub(crate) map: &'a ContextMap,
    pub(crate) values: Option<Mdc>,
}

impl<'a> ForkedContext<'a> {
    /// Installs the fork on the calling thread until the guard is dropped.
    #[must_use]
    pub fn enter(self) -> ContextGuard<'a> {
        ContextGuard::enter(self)
    }

    /// Runs `f` with the fork installed on the calling thread.
    pub fn run<R>(self, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter();
        f()
    }

    /// The entries the fork will install.
    #[must_use]
    pub const fn values(&self) -> Option<&Mdc> {
        self.values.as_ref()
    }
}

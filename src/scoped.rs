//! A single slot holding one value per thread.

use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
    thread::{self, ThreadId},
};

use parking_lot::Mutex;

type Slot<T> = Arc<Mutex<T>>;

/// A value scoped to the calling thread, created on first access from a default factory.
///
/// Unlike `thread_local!`, a `ScopedCell` is an ordinary value: it can live inside a
/// struct, and the values materialized by every thread stay reachable through
/// [`ScopedCell::all_values`] and [`ScopedCell::clear_all`].
///
/// Each thread owns its own slot. The slot map lock is only held to find or insert
/// a slot, so threads never wait on each other while working with their values.
pub struct ScopedCell<T> {
    slots: Mutex<HashMap<ThreadId, Slot<T>>>,
    init: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T> ScopedCell<T> {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            slots: Mutex::new(HashMap::new()),
            init: Box::new(init),
        }
    }

    fn slot(&self) -> Slot<T> {
        let id = thread::current().id();
        if let Some(slot) = self.slots.lock().get(&id) {
            return Arc::clone(slot);
        }
        // Only the current thread inserts under its own id, so computing the
        // default outside the lock cannot race with another initializer.
        let value = (self.init)();
        Arc::clone(
            self.slots
                .lock()
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(value))),
        )
    }

    /// Runs `f` with the calling thread's value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let slot = self.slot();
        let value = slot.lock();
        f(&value)
    }

    /// Runs `f` with mutable access to the calling thread's value.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let slot = self.slot();
        let mut value = slot.lock();
        f(&mut value)
    }

    /// Overwrites the calling thread's value.
    pub fn set(&self, value: T) {
        self.replace(value);
    }

    /// Overwrites the calling thread's value, returning the previous one.
    pub fn replace(&self, value: T) -> T {
        self.with_mut(|current| std::mem::replace(current, value))
    }

    /// Forgets the calling thread's value; the next access recreates it from the factory.
    pub fn remove(&self) {
        self.slots.lock().remove(&thread::current().id());
    }

    /// Stores a freshly created default for the calling thread.
    pub fn reset(&self) {
        let value = (self.init)();
        self.slots
            .lock()
            .insert(thread::current().id(), Arc::new(Mutex::new(value)));
    }

    /// Forgets the values of every thread.
    pub fn clear_all(&self) {
        self.slots.lock().clear();
    }

    /// Whether the calling thread has materialized a value.
    pub fn is_materialized(&self) -> bool {
        self.slots.lock().contains_key(&thread::current().id())
    }
}

impl<T: Clone> ScopedCell<T> {
    /// Returns a copy of the calling thread's value.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Returns a copy of every value materialized so far, by any thread.
    pub fn all_values(&self) -> Vec<T> {
        let slots: Vec<_> = self.slots.lock().values().cloned().collect();
        slots.iter().map(|slot| slot.lock().clone()).collect()
    }
}

impl<T: Default + 'static> Default for ScopedCell<T> {
    fn default() -> Self {
        Self::new(T::default)
    }
}

impl<T> fmt::Debug for ScopedCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCell")
            .field("materialized", &self.slots.lock().len())
            .finish_non_exhaustive()
    }
}

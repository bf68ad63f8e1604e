//! A value bound to one storage key, with change notification.

use crate::storage::{JsonStore, KeyValueStorage};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Box<dyn Fn(&Rc<T>)>;

/// Live value mirrored to storage on every write.
///
/// Reads hand out `Rc` snapshots. Writes always install a fresh `Rc`, so a
/// holder of an old snapshot can detect a change with `Rc::ptr_eq`.
pub struct PersistedValue<T, S: KeyValueStorage> {
    key: String,
    store: JsonStore<S>,
    value: Rc<T>,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
    next_subscription: u64,
}

impl<T, S> PersistedValue<T, S>
where
    T: Serialize + DeserializeOwned,
    S: KeyValueStorage,
{
    pub fn new<K: Into<String>>(store: JsonStore<S>, key: K, initial: T) -> Self {
        let key = key.into();
        let value = store.get(&key, initial);
        Self {
            key,
            store,
            value: Rc::new(value),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> Rc<T> {
        Rc::clone(&self.value)
    }

    /// Replaces the value. Returns whether it reached storage; the live value
    /// is updated either way.
    pub fn set(&mut self, next: T) -> bool {
        let persisted = self.store.set(&self.key, &next);
        self.value = Rc::new(next);
        debug!(key = %self.key, persisted, "persisted value updated");
        self.notify();
        persisted
    }

    /// Computes the next value from the current one.
    pub fn update<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value);
        self.set(next)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&Rc<T>) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn notify(&self) {
        for (_, listener) in &self.listeners {
            listener(&self.value);
        }
    }
}

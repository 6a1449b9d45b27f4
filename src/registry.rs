//! Dispatch registry: a thread-safe map from message type names to
//! type-erased handler entries.
//!
//! Each bus owns its own `Registry`. Entries are stored as
//! `Box<dyn Any>` holding a concrete value (an `Arc<dyn Handler<..>>`,
//! a `Vec` of them, or a handler/gate pair) and recovered by downcast.
//! A downcast miss reads the same as an absent key: the caller sees
//! "not registered" rather than a shape error.

use std::any::Any;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::DispatchError;

type Entry = Box<dyn Any + Send + Sync>;

/// Thread-safe mapping from a message type name to one or more
/// registered handlers.
///
/// Safe for simultaneous registration and lookup from independent
/// tasks; no external locking is required. Entries live as long as the
/// registry itself; there is no eviction or TTL.
pub(crate) struct Registry {
    entries: RwLock<HashMap<&'static str, Entry>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a single-handler entry, silently overwriting any prior
    /// registration under the same key. Overwrite-on-collision is an
    /// explicit design choice of the command channels, not an error.
    pub(crate) fn insert<V>(&self, key: &'static str, value: V) -> Result<(), DispatchError>
    where
        V: Any + Send + Sync,
    {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| DispatchError::LockPoisoned("insert"))?;
        entries.insert(key, Box::new(value));
        Ok(())
    }

    /// Append to the ordered multi-handler list under `key`, creating
    /// the list on first subscription. Order of appends is preserved.
    pub(crate) fn append<V>(&self, key: &'static str, value: V) -> Result<(), DispatchError>
    where
        V: Any + Send + Sync,
    {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| DispatchError::LockPoisoned("append"))?;
        let entry = entries
            .entry(key)
            .or_insert_with(|| Box::new(Vec::<V>::new()));
        match entry.downcast_mut::<Vec<V>>() {
            Some(list) => list.push(value),
            // Key was previously used with a different entry shape;
            // start a fresh list, matching overwrite semantics.
            None => {
                *entry = Box::new(vec![value]);
            }
        }
        Ok(())
    }

    /// Look up the entry under `key`, cloning it out of the map.
    ///
    /// Returns `None` when the key is absent or the stored entry is not
    /// of the expected shape.
    pub(crate) fn get<V>(&self, key: &str) -> Result<Option<V>, DispatchError>
    where
        V: Any + Clone,
    {
        let entries = self
            .entries
            .read()
            .map_err(|_| DispatchError::LockPoisoned("get"))?;
        Ok(entries
            .get(key)
            .and_then(|entry| entry.downcast_ref::<V>())
            .cloned())
    }

    /// Get the entry under `key`, creating it with `init` if absent.
    ///
    /// Creation happens under the write lock, so exactly one value is
    /// ever created per key regardless of how many callers race here.
    pub(crate) fn get_or_insert_with<V, F>(
        &self,
        key: &'static str,
        init: F,
    ) -> Result<V, DispatchError>
    where
        V: Any + Send + Sync + Clone,
        F: FnOnce() -> V,
    {
        if let Some(existing) = self.get::<V>(key)? {
            return Ok(existing);
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| DispatchError::LockPoisoned("get_or_insert"))?;
        // Re-check under the write lock; another caller may have won.
        if let Some(existing) = entries.get(key).and_then(|e| e.downcast_ref::<V>()) {
            return Ok(existing.clone());
        }
        let value = init();
        entries.insert(key, Box::new(value.clone()));
        Ok(value)
    }
}

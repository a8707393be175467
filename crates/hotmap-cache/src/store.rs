//! Storage backends for cached aggregates.

use std::collections::HashMap;
use std::sync::RwLock;

use hotmap_core::HotmapError;

use crate::policy::CacheEntry;

/// Byte-keyed store of [`CacheEntry`] values.
///
/// Keys are fingerprint hex strings. `set` replaces any existing entry
/// atomically; a reader never observes a partially written entry.
pub trait CacheStore: Send + Sync {
    /// Name of this backend (for logging).
    fn name(&self) -> &str;

    /// Fetch the entry stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`HotmapError::Cache`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, HotmapError>;

    /// Store `entry` under `key`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns [`HotmapError::Cache`] if the backend cannot be written.
    fn set(&self, key: &str, entry: &CacheEntry) -> Result<(), HotmapError>;
}

/// Process-local store. Entries live as long as the value.
///
/// # Examples
///
/// ```
/// use hotmap_cache::policy::CacheEntry;
/// use hotmap_cache::store::{CacheStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// let entry = CacheEntry { payload: vec![1, 2, 3], schema_version: 1, stored_at: 42 };
/// store.set("k", &entry).unwrap();
/// assert_eq!(store.get("k").unwrap(), Some(entry));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>, HotmapError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, entry: &CacheEntry) -> Result<(), HotmapError> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get("absent").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn set_replaces_existing_entry() {
        let store = MemoryStore::new();
        let first = CacheEntry {
            payload: b"old".to_vec(),
            schema_version: 1,
            stored_at: 10,
        };
        let second = CacheEntry {
            payload: b"new".to_vec(),
            schema_version: 2,
            stored_at: 20,
        };
        store.set("k", &first).unwrap();
        store.set("k", &second).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k").unwrap(), Some(second));
    }
}

//! Shared cache handle with miss folding and exactly-once release.

use std::sync::RwLock;

use hotmap_core::HotmapError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::fingerprint::CacheFingerprint;
use crate::policy::{evaluate, CacheEntry, Freshness, SCHEMA_VERSION};
use crate::store::CacheStore;

/// Result of a cache lookup.
#[derive(Debug)]
pub enum Lookup<T> {
    /// A fresh, decodable entry.
    Hit(T),
    /// Anything else. Callers recompute and overwrite.
    Miss(MissReason),
}

/// Why a lookup missed. Only used for logging; every reason is handled the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// Nothing stored under the key.
    Absent,
    /// The handle was already closed.
    Closed,
    /// The backend failed to read.
    Store(String),
    /// The payload could not be decoded.
    Decode(String),
    /// Written by another payload layout.
    VersionMismatch {
        /// Version found in the store.
        found: u32,
        /// Version this build expects.
        expected: u32,
    },
    /// Older than the freshness window.
    Stale {
        /// Age of the entry in seconds.
        age_secs: i64,
    },
}

/// Cache handle owned by the composition root and lent to the pipeline.
///
/// Construct it once at startup and pass `&CacheManager` to callers. Reads
/// may happen from any number of threads. [`CacheManager::close`] drops the
/// underlying store the first time it is called and is a no-op afterwards.
///
/// # Examples
///
/// ```
/// use hotmap_cache::fingerprint::CacheFingerprint;
/// use hotmap_cache::manager::{CacheManager, Lookup};
/// use hotmap_cache::store::MemoryStore;
/// use hotmap_core::{ScoreMode, TimeWindow};
///
/// let cache = CacheManager::new(MemoryStore::new());
/// let key = CacheFingerprint::derive("abc", ScoreMode::Hot, &TimeWindow::unbounded());
///
/// assert!(matches!(cache.lookup::<Vec<u32>>(&key, 1_000), Lookup::Miss(_)));
/// cache.store(&key, &vec![1u32, 2, 3], 1_000).unwrap();
/// assert!(matches!(cache.lookup::<Vec<u32>>(&key, 1_060), Lookup::Hit(v) if v == [1, 2, 3]));
///
/// assert!(cache.close());
/// assert!(!cache.close());
/// ```
pub struct CacheManager {
    store: RwLock<Option<Box<dyn CacheStore>>>,
    schema_version: u32,
}

impl CacheManager {
    /// Wrap `store` using the current [`SCHEMA_VERSION`].
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self::with_schema_version(store, SCHEMA_VERSION)
    }

    /// Wrap `store` with an explicit payload layout version.
    pub fn with_schema_version(store: impl CacheStore + 'static, schema_version: u32) -> Self {
        Self {
            store: RwLock::new(Some(Box::new(store))),
            schema_version,
        }
    }

    /// Payload layout version written and accepted by this handle.
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Look up `key` at `now` (Unix seconds), folding every failure into a miss.
    pub fn lookup<T: DeserializeOwned>(&self, key: &CacheFingerprint, now: i64) -> Lookup<T> {
        let guard = self.store.read().unwrap_or_else(|e| e.into_inner());
        let Some(store) = guard.as_ref() else {
            return miss(key, MissReason::Closed);
        };

        let entry = match store.get(key.as_str()) {
            Ok(Some(entry)) => entry,
            Ok(None) => return miss(key, MissReason::Absent),
            Err(e) => return miss(key, MissReason::Store(e.to_string())),
        };

        match evaluate(&entry, self.schema_version, now) {
            Freshness::Fresh => {}
            Freshness::VersionMismatch { found, expected } => {
                return miss(key, MissReason::VersionMismatch { found, expected });
            }
            Freshness::Stale { age_secs } => {
                return miss(key, MissReason::Stale { age_secs });
            }
        }

        match serde_json::from_slice(&entry.payload) {
            Ok(value) => {
                debug!(key = %key, backend = store.name(), "cache hit");
                Lookup::Hit(value)
            }
            Err(e) => miss(key, MissReason::Decode(e.to_string())),
        }
    }

    /// Serialize `value` and replace the entry under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`HotmapError::Serialization`] if encoding fails, or
    /// [`HotmapError::Cache`] if the handle is closed or the write fails.
    pub fn store<T: Serialize>(
        &self,
        key: &CacheFingerprint,
        value: &T,
        now: i64,
    ) -> Result<(), HotmapError> {
        let entry = CacheEntry {
            payload: serde_json::to_vec(value)?,
            schema_version: self.schema_version,
            stored_at: now,
        };
        let guard = self.store.read().unwrap_or_else(|e| e.into_inner());
        let store = guard
            .as_ref()
            .ok_or_else(|| HotmapError::Cache("cache handle is closed".into()))?;
        store.set(key.as_str(), &entry)?;
        debug!(key = %key, bytes = entry.payload.len(), "cache entry written");
        Ok(())
    }

    /// Release the underlying store.
    ///
    /// Returns `true` only for the call that actually released it.
    pub fn close(&self) -> bool {
        let released = self
            .store
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match released {
            Some(store) => {
                debug!(backend = store.name(), "cache store released");
                true
            }
            None => false,
        }
    }

    /// Whether [`CacheManager::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.store
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        self.close();
    }
}

fn miss<T>(key: &CacheFingerprint, reason: MissReason) -> Lookup<T> {
    debug!(key = %key, ?reason, "cache miss");
    Lookup::Miss(reason)
}

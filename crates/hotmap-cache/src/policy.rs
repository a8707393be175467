//! Freshness rules for stored aggregates.

/// Version of the serialized aggregate layout. Bump when the payload changes shape.
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum age of a reusable entry: seven days.
pub const FRESHNESS_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

/// A stored aggregate as returned by a [`crate::store::CacheStore`].
///
/// # Examples
///
/// ```
/// use hotmap_cache::policy::{CacheEntry, SCHEMA_VERSION};
///
/// let entry = CacheEntry {
///     payload: b"{}".to_vec(),
///     schema_version: SCHEMA_VERSION,
///     stored_at: 1_700_000_000,
/// };
/// assert_eq!(entry.payload.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Opaque serialized aggregate.
    pub payload: Vec<u8>,
    /// Layout version the payload was written with.
    pub schema_version: u32,
    /// Unix timestamp (seconds) of the write.
    pub stored_at: i64,
}

/// Outcome of checking an entry against the current engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Usable as-is.
    Fresh,
    /// Written by a different payload layout.
    VersionMismatch {
        /// Version found in the store.
        found: u32,
        /// Version this build expects.
        expected: u32,
    },
    /// Older than [`FRESHNESS_WINDOW_SECS`].
    Stale {
        /// Age of the entry in seconds.
        age_secs: i64,
    },
}

/// Decide whether `entry` may be reused at `now` (Unix seconds).
///
/// # Examples
///
/// ```
/// use hotmap_cache::policy::{evaluate, CacheEntry, Freshness, FRESHNESS_WINDOW_SECS};
///
/// let entry = CacheEntry { payload: vec![], schema_version: 3, stored_at: 1_000 };
/// assert_eq!(evaluate(&entry, 3, 1_000 + FRESHNESS_WINDOW_SECS), Freshness::Fresh);
/// assert!(matches!(evaluate(&entry, 4, 1_000), Freshness::VersionMismatch { .. }));
/// ```
pub fn evaluate(entry: &CacheEntry, current_version: u32, now: i64) -> Freshness {
    if entry.schema_version != current_version {
        return Freshness::VersionMismatch {
            found: entry.schema_version,
            expected: current_version,
        };
    }
    let age_secs = now.saturating_sub(entry.stored_at);
    if age_secs > FRESHNESS_WINDOW_SECS {
        return Freshness::Stale { age_secs };
    }
    Freshness::Fresh
}

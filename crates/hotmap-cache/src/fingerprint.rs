//! Deterministic cache keys for aggregation queries.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use hotmap_core::{ScoreMode, TimeWindow};
use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 64;

/// SHA-256 digest identifying one (repository state, window, mode) query.
///
/// # Examples
///
/// ```
/// use hotmap_cache::fingerprint::CacheFingerprint;
/// use hotmap_core::{ScoreMode, TimeWindow};
///
/// let a = CacheFingerprint::derive("4f2a9c1", ScoreMode::Hot, &TimeWindow::unbounded());
/// let b = CacheFingerprint::derive("4f2a9c1", ScoreMode::Hot, &TimeWindow::unbounded());
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheFingerprint(String);

impl CacheFingerprint {
    /// Hash the repository identity, mode, and exact window bounds.
    ///
    /// Fields are separated by a NUL byte so that shifting characters between
    /// adjacent fields yields a different digest. An unbounded side hashes as
    /// an empty field, which no formatted timestamp can equal.
    pub fn derive(repo_identity: &str, mode: ScoreMode, window: &TimeWindow) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(repo_identity.as_bytes());
        hasher.update([0u8]);
        hasher.update(mode.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(format_bound(window.start).as_bytes());
        hasher.update([0u8]);
        hasher.update(format_bound(window.end).as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// The lowercase hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn format_bound(bound: Option<DateTime<Utc>>) -> String {
    bound
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .unwrap_or_default()
}

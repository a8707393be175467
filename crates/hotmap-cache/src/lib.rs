//! Aggregate caching: fingerprints, freshness policy, and storage.
//!
//! A computed aggregate is stored under a [`fingerprint::CacheFingerprint`]
//! derived from the repository state, query window, and scoring mode. The
//! [`manager::CacheManager`] folds every failure to read or validate an entry
//! into a single miss, so callers either reuse a fresh aggregate or recompute.

pub mod fingerprint;
pub mod manager;
pub mod policy;
pub mod sqlite;
pub mod store;

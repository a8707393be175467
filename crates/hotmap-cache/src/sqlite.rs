//! SQLite-backed aggregate cache.

use std::path::Path;
use std::sync::Mutex;

use hotmap_core::HotmapError;
use rusqlite::{params, Connection, OptionalExtension};

use crate::policy::CacheEntry;
use crate::store::CacheStore;

/// Single-table SQLite cache keyed by fingerprint.
///
/// # Examples
///
/// ```
/// use hotmap_cache::policy::CacheEntry;
/// use hotmap_cache::sqlite::SqliteStore;
/// use hotmap_cache::store::CacheStore;
///
/// let store = SqliteStore::in_memory().unwrap();
/// let entry = CacheEntry { payload: b"{}".to_vec(), schema_version: 1, stored_at: 7 };
/// store.set("abc", &entry).unwrap();
/// assert_eq!(store.get("abc").unwrap(), Some(entry));
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a cache database at the given path.
    ///
    /// Creates the parent directory and table if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`HotmapError::Cache`] if the database cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use hotmap_cache::sqlite::SqliteStore;
    ///
    /// let store = SqliteStore::open(Path::new(".hotmap/cache.db")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self, HotmapError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    HotmapError::Cache(format!("failed to create cache directory: {e}"))
                })?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| HotmapError::Cache(format!("failed to open cache database: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory cache (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`HotmapError::Cache`] if schema creation fails.
    pub fn in_memory() -> Result<Self, HotmapError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            HotmapError::Cache(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), HotmapError> {
        self.conn
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS activity_cache (
                    cache_key TEXT PRIMARY KEY,
                    payload BLOB NOT NULL,
                    schema_version INTEGER NOT NULL,
                    stored_at INTEGER NOT NULL
                );
                ",
            )
            .map_err(|e| HotmapError::Cache(format!("failed to create schema: {e}")))?;

        Ok(())
    }
}

impl CacheStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>, HotmapError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row(
            "SELECT payload, schema_version, stored_at FROM activity_cache WHERE cache_key = ?1",
            params![key],
            |row| {
                Ok(CacheEntry {
                    payload: row.get(0)?,
                    schema_version: row.get(1)?,
                    stored_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| HotmapError::Cache(format!("failed to read cache entry: {e}")))
    }

    fn set(&self, key: &str, entry: &CacheEntry) -> Result<(), HotmapError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT OR REPLACE INTO activity_cache (cache_key, payload, schema_version, stored_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, entry.payload, entry.schema_version, entry.stored_at],
        )
        .map_err(|e| HotmapError::Cache(format!("failed to write cache entry: {e}")))?;
        Ok(())
    }
}

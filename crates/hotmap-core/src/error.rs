use std::path::PathBuf;

/// Errors that can occur across hotmap.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `miette` diagnostics at the boundary.
///
/// # Examples
///
/// ```
/// use hotmap_core::HotmapError;
///
/// let err = HotmapError::Git("log source unavailable".into());
/// assert!(err.to_string().contains("log source unavailable"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum HotmapError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure (log retrieval, reference listing, identity).
    #[error("git error: {0}")]
    Git(String),

    /// Cache store failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// An explicitly named file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: HotmapError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn cache_error_displays_message() {
        let err = HotmapError::Cache("database is locked".into());
        assert_eq!(err.to_string(), "cache error: database is locked");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = HotmapError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert!(err.to_string().contains("/tmp/missing.toml"));
    }
}

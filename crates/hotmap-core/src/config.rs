use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HotmapError;
use crate::types::ScoreMode;

/// Commented template written by `hotmap init`.
pub const CONFIG_TEMPLATE: &str = r#"# hotmap configuration

[analysis]
# Scoring mode: "hot", "risk", "complexity" or "stale"
# mode = "hot"

# Only mine commits from the last N days
# since_days = 180

# Restrict results to paths under this prefix
# path_filter = "src/"

# Glob patterns for files to leave out of the report
# excludes = ["*.lock", "vendor/**"]

# Maximum rows to print
# limit = 20

# Reference whose tree decides which files are still alive
# reference = "HEAD"

# Give up on `git log` after this many seconds
# log_timeout_secs = 60

[cache]
# Reuse aggregates computed in the last seven days
# enabled = true
# path = ".hotmap/cache.db"
"#;

/// Top-level configuration loaded from `.hotmap.toml`.
///
/// Supports layered resolution: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use hotmap_core::HotmapConfig;
///
/// let config = HotmapConfig::default();
/// assert_eq!(config.analysis.since_days, 180);
/// assert!(config.cache.enabled);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HotmapConfig {
    /// History analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Aggregate cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl HotmapConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HotmapError::FileNotFound`] if `path` does not exist,
    /// [`HotmapError::Io`] if it cannot be read, or [`HotmapError::Toml`] if
    /// the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hotmap_core::HotmapConfig;
    /// use std::path::Path;
    ///
    /// let config = HotmapConfig::from_file(Path::new(".hotmap.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, HotmapError> {
        if !path.exists() {
            return Err(HotmapError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`HotmapError::Toml`] if parsing fails, or
    /// [`HotmapError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use hotmap_core::{HotmapConfig, ScoreMode};
    ///
    /// let toml = r#"
    /// [analysis]
    /// mode = "stale"
    /// "#;
    /// let config = HotmapConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.analysis.mode, ScoreMode::Stale);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, HotmapError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), HotmapError> {
        if self.analysis.log_timeout_secs == 0 {
            return Err(HotmapError::Config(
                "analysis.log_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.analysis.reference.trim().is_empty() {
            return Err(HotmapError::Config(
                "analysis.reference must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// History analysis configuration.
///
/// # Examples
///
/// ```
/// use hotmap_core::{AnalysisConfig, ScoreMode};
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.mode, ScoreMode::Hot);
/// assert_eq!(config.limit, 20);
/// assert_eq!(config.reference, "HEAD");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Scoring mode (default: hot).
    #[serde(default)]
    pub mode: ScoreMode,
    /// Only include commits from the last N days (default: 180).
    #[serde(default = "default_since_days")]
    pub since_days: u64,
    /// Only report paths starting with this prefix.
    pub path_filter: Option<String>,
    /// Glob patterns for paths to exclude.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Maximum rows per report (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Reference listing the live files (default: `HEAD`).
    #[serde(default = "default_reference")]
    pub reference: String,
    /// Timeout for producing the raw log, in seconds (default: 60).
    #[serde(default = "default_log_timeout_secs")]
    pub log_timeout_secs: u64,
}

fn default_since_days() -> u64 {
    180
}

fn default_limit() -> usize {
    20
}

fn default_reference() -> String {
    "HEAD".into()
}

fn default_log_timeout_secs() -> u64 {
    60
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: ScoreMode::default(),
            since_days: default_since_days(),
            path_filter: None,
            excludes: Vec::new(),
            limit: default_limit(),
            reference: default_reference(),
            log_timeout_secs: default_log_timeout_secs(),
        }
    }
}

/// Aggregate cache configuration.
///
/// # Examples
///
/// ```
/// use hotmap_core::CacheConfig;
/// use std::path::PathBuf;
///
/// let config = CacheConfig::default();
/// assert_eq!(config.path, PathBuf::from(".hotmap/cache.db"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether cached aggregates may be reused (default: true).
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Location of the cache database, relative to the repository.
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(".hotmap/cache.db")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: default_cache_path(),
        }
    }
}

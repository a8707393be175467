//! Cached analysis entry point.
//!
//! [`aggregate_activity`] derives the cache fingerprint, serves fresh
//! entries from the injected [`CacheManager`], and otherwise mines the log
//! and writes the result back. [`build_report`] turns an aggregate into
//! scored files and folders.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use hotmap_cache::fingerprint::CacheFingerprint;
use hotmap_cache::manager::{CacheManager, Lookup};
use hotmap_core::{HotmapError, ScoreMode, TimeWindow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::{aggregate, AggregateOutput};
use crate::files::{build_file_list, ExclusionMatcher};
use crate::folders::{score_folders, FolderResult};
use crate::rename::FileExistenceSet;
use crate::scoring::{score_files, FileResult, LineCounter};
use crate::source::{LogSource, RepoIdentity};

/// What to analyze.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Repository root.
    pub repo: PathBuf,
    /// Revision whose tree decides which paths are live.
    pub reference: String,
    /// Commit dates to include.
    pub window: TimeWindow,
    /// Scoring mode, part of the cache key.
    pub mode: ScoreMode,
}

/// Where an aggregate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Served from a fresh cache entry.
    Cache,
    /// Mined from the log on this run.
    Fresh,
}

/// An aggregate and its origin.
#[derive(Debug, Clone)]
pub struct Aggregated {
    /// Per-file statistics.
    pub output: AggregateOutput,
    /// Cache or fresh.
    pub origin: Origin,
}

/// Produce the aggregate for `request`, consulting `cache` when given.
///
/// Identity failures degrade to an empty identity. Any cache miss, including
/// read and decode failures, recomputes. A failed cache write is logged and
/// does not fail the call.
///
/// # Errors
///
/// Returns the source's error unchanged when the log or the reference file
/// list cannot be read.
pub fn aggregate_activity(
    request: &AnalysisRequest,
    source: &dyn LogSource,
    identity: &dyn RepoIdentity,
    cache: Option<&CacheManager>,
    now: DateTime<Utc>,
) -> Result<Aggregated, HotmapError> {
    let now_secs = now.timestamp();
    let key = cache.map(|_| {
        let repo_id = match identity.identity(&request.repo, &request.reference) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "repository identity unavailable, caching under empty identity");
                String::new()
            }
        };
        CacheFingerprint::derive(&repo_id, request.mode, &request.window)
    });

    if let (Some(cache), Some(key)) = (cache, key.as_ref()) {
        if let Lookup::Hit(output) = cache.lookup::<AggregateOutput>(key, now_secs) {
            return Ok(Aggregated {
                output,
                origin: Origin::Cache,
            });
        }
    }

    let log = source.log(&request.repo, &request.reference, &request.window)?;
    let live: FileExistenceSet = source
        .files_at(&request.repo, &request.reference)?
        .into_iter()
        .collect();
    debug!(live_files = live.len(), "resolved reference tree");
    let output = aggregate(&log, &live);

    if let (Some(cache), Some(key)) = (cache, key.as_ref()) {
        if let Err(e) = cache.store(key, &output, now_secs) {
            warn!(error = %e, "failed to write aggregate cache");
        }
    }

    Ok(Aggregated {
        output,
        origin: Origin::Fresh,
    })
}

/// Scored files and folders for one mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Mode the scores were computed for.
    pub mode: ScoreMode,
    /// Files, highest score first.
    pub files: Vec<FileResult>,
    /// Folders, highest score first.
    pub folders: Vec<FolderResult>,
}

/// Filter, score, and roll up an aggregate.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use hotmap_core::ScoreMode;
/// use hotmap_gitpulse::aggregate::aggregate;
/// use hotmap_gitpulse::files::GlobExcludes;
/// use hotmap_gitpulse::pipeline::build_report;
/// use hotmap_gitpulse::rename::FileExistenceSet;
/// use hotmap_gitpulse::scoring::LineCounter;
///
/// struct Ten;
/// impl LineCounter for Ten {
///     fn count_lines(&self, _path: &str) -> Option<u64> { Some(10) }
/// }
///
/// let log = "--1|alice|2024-01-01T00:00:00Z\n3\t1\tsrc/a.rs\n2\t0\tsrc/b.rs\n1\t1\tREADME.md\n";
/// let live: FileExistenceSet = ["src/a.rs", "src/b.rs", "README.md"].into_iter().collect();
/// let output = aggregate(log, &live);
///
/// let report = build_report(&output, ScoreMode::Hot, None, &GlobExcludes::none(), &Ten, Utc::now());
/// assert_eq!(report.files.len(), 3);
/// assert_eq!(report.folders.len(), 1);
/// assert_eq!(report.folders[0].path, "src");
/// ```
pub fn build_report(
    output: &AggregateOutput,
    mode: ScoreMode,
    path_prefix: Option<&str>,
    excludes: &dyn ExclusionMatcher,
    lines: &dyn LineCounter,
    now: DateTime<Utc>,
) -> Report {
    let paths = build_file_list(output, path_prefix, excludes);
    let files = score_files(output, &paths, mode, lines, now);
    let filter_active = path_prefix.is_some_and(|p| !p.is_empty());
    let folders = score_folders(&files, filter_active);
    debug!(
        candidates = paths.len(),
        folders = folders.len(),
        %mode,
        "built report"
    );
    Report {
        mode,
        files,
        folders,
    }
}

//! Per-file metrics and mode scores.
//!
//! Every metric is normalized by its maximum across the candidate set and
//! combined with the weights of the selected [`ScoreMode`]. Scores land in
//! `0.0..=100.0`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use hotmap_core::ScoreMode;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateOutput;

/// Owners listed per file.
pub const MAX_FILE_OWNERS: usize = 3;

/// Scored file with the raw metrics behind the score.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::scoring::FileResult;
///
/// let file = FileResult {
///     path: "src/auth.rs".into(),
///     commits: 12,
///     churn: 480,
///     lines_of_code: 210,
///     mode_score: 87.5,
///     owners: vec!["alice".into(), "bob".into()],
///     contributors: 2,
///     age_days: 300,
///     last_change_days: Some(3),
/// };
/// assert_eq!(file.primary_owner(), Some("alice"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    /// Path relative to the repository root.
    pub path: String,
    /// Commits touching the file.
    pub commits: u64,
    /// Lines added plus deleted.
    pub churn: u64,
    /// Current line count, 0 when unreadable.
    pub lines_of_code: u64,
    /// Score for the selected mode (0–100).
    pub mode_score: f64,
    /// Top authors by commit count.
    pub owners: Vec<String>,
    /// Distinct authors.
    pub contributors: u64,
    /// Days since the first dated commit, 0 when undated.
    pub age_days: u64,
    /// Days since the last dated commit.
    pub last_change_days: Option<u64>,
}

impl FileResult {
    /// Author with the most commits, if any.
    pub fn primary_owner(&self) -> Option<&str> {
        self.owners.first().map(String::as_str)
    }
}

/// Source of current line counts.
pub trait LineCounter {
    /// Lines in `path`, or `None` when it cannot be read as text.
    fn count_lines(&self, path: &str) -> Option<u64>;
}

/// Counts lines in the checked-out working tree.
#[derive(Debug, Clone)]
pub struct WorkingTreeLines {
    root: PathBuf,
}

impl WorkingTreeLines {
    /// Count files relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LineCounter for WorkingTreeLines {
    fn count_lines(&self, path: &str) -> Option<u64> {
        let content = std::fs::read_to_string(self.root.join(path)).ok()?;
        Some(content.lines().count() as u64)
    }
}

struct Metrics {
    path: String,
    commits: u64,
    churn: u64,
    loc: u64,
    contributors: u64,
    concentration: f64,
    age_days: u64,
    last_change_days: Option<u64>,
    owners: Vec<String>,
}

/// Score `paths` against the aggregated history.
///
/// Results are sorted by score descending, then by path.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use hotmap_core::ScoreMode;
/// use hotmap_gitpulse::aggregate::aggregate;
/// use hotmap_gitpulse::rename::FileExistenceSet;
/// use hotmap_gitpulse::scoring::{score_files, LineCounter};
///
/// struct Fixed;
/// impl LineCounter for Fixed {
///     fn count_lines(&self, _path: &str) -> Option<u64> { Some(100) }
/// }
///
/// let log = "--1|alice|2024-01-01T00:00:00Z\n9\t1\tbusy.rs\n1\t0\tquiet.rs\n\
///            --2|bob|2024-01-02T00:00:00Z\n5\t5\tbusy.rs\n";
/// let live: FileExistenceSet = ["busy.rs", "quiet.rs"].into_iter().collect();
/// let output = aggregate(log, &live);
/// let paths = vec!["busy.rs".to_string(), "quiet.rs".to_string()];
/// let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
///
/// let files = score_files(&output, &paths, ScoreMode::Hot, &Fixed, now);
/// assert_eq!(files[0].path, "busy.rs");
/// assert!((files[0].mode_score - 100.0).abs() < 1e-9);
/// ```
pub fn score_files(
    output: &AggregateOutput,
    paths: &[String],
    mode: ScoreMode,
    lines: &dyn LineCounter,
    now: DateTime<Utc>,
) -> Vec<FileResult> {
    let metrics: Vec<Metrics> = paths
        .iter()
        .map(|path| collect_metrics(output, path, lines, now))
        .collect();

    let max_commits = max_of(metrics.iter().map(|m| m.commits as f64));
    let max_churn = max_of(metrics.iter().map(|m| m.churn as f64));
    let max_loc = max_of(metrics.iter().map(|m| m.loc as f64));
    let max_contributors = max_of(metrics.iter().map(|m| m.contributors as f64));
    let max_age = max_of(metrics.iter().map(|m| m.age_days as f64));
    let max_inactive = max_of(metrics.iter().filter_map(|m| m.last_change_days.map(|d| d as f64)));

    let mut files: Vec<FileResult> = metrics
        .into_iter()
        .map(|m| {
            let commits = ratio(m.commits as f64, max_commits);
            let churn = ratio(m.churn as f64, max_churn);
            let loc = ratio(m.loc as f64, max_loc);
            let contributors = ratio(m.contributors as f64, max_contributors);
            let age = ratio(m.age_days as f64, max_age);
            let inactivity = m
                .last_change_days
                .map_or(0.0, |d| ratio(d as f64, max_inactive));

            // Anonymous-only history says nothing about ownership.
            let ownership = if m.contributors > 0 {
                1.0 - contributors
            } else {
                0.0
            };

            let weighted = match mode {
                ScoreMode::Hot => 0.45 * commits + 0.35 * churn + 0.20 * contributors,
                ScoreMode::Risk => {
                    0.40 * m.concentration
                        + 0.25 * commits
                        + 0.20 * churn
                        + 0.15 * ownership
                }
                ScoreMode::Complexity => 0.40 * loc + 0.30 * churn + 0.30 * age,
                ScoreMode::Stale => 0.50 * inactivity + 0.30 * loc + 0.20 * age,
            };

            FileResult {
                path: m.path,
                commits: m.commits,
                churn: m.churn,
                lines_of_code: m.loc,
                mode_score: (weighted * 100.0).clamp(0.0, 100.0),
                owners: m.owners,
                contributors: m.contributors,
                age_days: m.age_days,
                last_change_days: m.last_change_days,
            }
        })
        .collect();

    files.sort_by(|a, b| {
        b.mode_score
            .partial_cmp(&a.mode_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
    files
}

fn collect_metrics(
    output: &AggregateOutput,
    path: &str,
    lines: &dyn LineCounter,
    now: DateTime<Utc>,
) -> Metrics {
    let mut authors: Vec<(&str, u64)> = output
        .contributor_counts
        .get(path)
        .map(|by_author| by_author.iter().map(|(a, n)| (a.as_str(), *n)).collect())
        .unwrap_or_default();
    authors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let attributed: u64 = authors.iter().map(|(_, n)| n).sum();
    let concentration = match authors.first() {
        Some((_, top)) if attributed > 0 => *top as f64 / attributed as f64,
        _ => 0.0,
    };

    Metrics {
        path: path.to_string(),
        commits: output.commit_counts.get(path).copied().unwrap_or(0),
        churn: output.churn_totals.get(path).copied().unwrap_or(0),
        loc: lines.count_lines(path).unwrap_or(0),
        contributors: authors.len() as u64,
        concentration,
        age_days: output
            .first_commit_dates
            .get(path)
            .map_or(0, |first| days_between(*first, now)),
        last_change_days: output
            .last_commit_dates
            .get(path)
            .map(|last| days_between(*last, now)),
        owners: authors
            .iter()
            .take(MAX_FILE_OWNERS)
            .map(|(a, _)| a.to_string())
            .collect(),
    }
}

fn days_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - earlier).num_days().max(0) as u64
}

fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0f64, f64::max)
}

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

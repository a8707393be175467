//! Folding of log records into per-file statistics.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::numstat::{parse_log, CommitHeader, LogRecord};
use crate::rename::{resolve, FileExistenceSet, PathSpec, RenameTrail};

/// Per-file accumulators keyed by path.
///
/// Every key was resolved as live when it was recorded.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::aggregate::aggregate;
/// use hotmap_gitpulse::rename::FileExistenceSet;
///
/// let log = "\
/// --c1|alice|2024-01-01T00:00:00Z
/// 50\t10\tcore/a.go
/// --c2|bob|2024-02-01T00:00:00Z
/// 8\t1\tcore/{a.go => b.go}
/// ";
/// let live: FileExistenceSet = ["core/b.go"].into_iter().collect();
/// let output = aggregate(log, &live);
/// assert_eq!(output.commit_counts.get("core/b.go"), Some(&2));
/// assert_eq!(output.churn_totals.get("core/b.go"), Some(&69));
/// assert!(!output.commit_counts.contains_key("core/a.go"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOutput {
    /// Commits touching each path.
    pub commit_counts: HashMap<String, u64>,
    /// Lines added plus deleted, summed over commits.
    pub churn_totals: HashMap<String, u64>,
    /// Commits per author, per path. Anonymous commits are not counted.
    pub contributor_counts: HashMap<String, HashMap<String, u64>>,
    /// Earliest dated commit per path.
    pub first_commit_dates: HashMap<String, DateTime<Utc>>,
    /// Latest dated commit per path.
    #[serde(default)]
    pub last_commit_dates: HashMap<String, DateTime<Utc>>,
}

impl AggregateOutput {
    /// Attribute one commit's change of `churn` lines on `path`.
    pub fn record(&mut self, path: &str, commit: &CommitHeader, churn: u64) {
        *self.commit_counts.entry(path.to_string()).or_default() += 1;
        let total = self.churn_totals.entry(path.to_string()).or_default();
        *total = total.saturating_add(churn);

        if !commit.author.is_empty() {
            *self
                .contributor_counts
                .entry(path.to_string())
                .or_default()
                .entry(commit.author.clone())
                .or_default() += 1;
        }

        if let Some(date) = commit.date {
            self.first_commit_dates
                .entry(path.to_string())
                .and_modify(|first| *first = (*first).min(date))
                .or_insert(date);
            self.last_commit_dates
                .entry(path.to_string())
                .and_modify(|last| *last = (*last).max(date))
                .or_insert(date);
        }
    }

    /// Union of paths across the count, churn, and contributor maps, sorted.
    pub fn paths(&self) -> BTreeSet<&str> {
        self.commit_counts
            .keys()
            .chain(self.churn_totals.keys())
            .chain(self.contributor_counts.keys())
            .map(String::as_str)
            .collect()
    }

    /// Whether no path has any statistic.
    pub fn is_empty(&self) -> bool {
        self.commit_counts.is_empty()
            && self.churn_totals.is_empty()
            && self.contributor_counts.is_empty()
    }
}

/// Fold raw log text into an [`AggregateOutput`], keeping only live paths.
///
/// The log is read twice. The first pass collects every rename so that
/// changes recorded under a path that was later moved are credited to the
/// file's live name regardless of commit order.
pub fn aggregate(log: &str, live: &FileExistenceSet) -> AggregateOutput {
    let trail = collect_renames(log);

    let mut output = AggregateOutput::default();
    let mut current = CommitHeader::anonymous();
    let mut commits = 0usize;
    let mut dropped = 0usize;
    let mut followed = 0usize;

    let mut records = parse_log(log);
    for record in records.by_ref() {
        match record {
            LogRecord::Commit(header) => {
                current = header;
                commits += 1;
            }
            LogRecord::Change(change) => {
                let mut paths = resolve(&change.path_spec, live);
                if paths.is_empty() {
                    match follow_dead(&change.path_spec, &trail, live) {
                        Some(path) => {
                            followed += 1;
                            paths.push(path.to_string());
                        }
                        None => dropped += 1,
                    }
                }
                let churn = change.churn();
                for path in &paths {
                    output.record(path, &current, churn);
                }
            }
        }
    }

    debug!(
        commits,
        files = output.commit_counts.len(),
        renames = trail.len(),
        followed_changes = followed,
        dropped_changes = dropped,
        skipped_lines = records.skipped_lines(),
        "aggregated log"
    );
    output
}

fn collect_renames(log: &str) -> RenameTrail {
    let mut trail = RenameTrail::default();
    for record in parse_log(log) {
        if let LogRecord::Change(change) = record {
            if let PathSpec::Rename { old, new } = PathSpec::parse(&change.path_spec) {
                trail.record(&old, &new);
            }
        }
    }
    trail
}

fn follow_dead<'t>(spec: &str, trail: &'t RenameTrail, live: &FileExistenceSet) -> Option<&'t str> {
    match PathSpec::parse(spec) {
        PathSpec::Plain(path) => trail.follow(path, live),
        PathSpec::Rename { old, new } => trail
            .follow(&new, live)
            .or_else(|| trail.follow(&old, live)),
        PathSpec::Malformed => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn live(paths: &[&str]) -> FileExistenceSet {
        paths.iter().copied().collect()
    }

    #[test]
    fn rename_history_follows_the_file() {
        let log = "\
--c1|alice|2024-01-01T00:00:00Z
50\t10\tcore/a.go

--c2|bob|2024-02-01T00:00:00Z
8\t1\tcore/{a.go => b.go}
";
        let output = aggregate(log, &live(&["core/b.go"]));
        assert_eq!(output.commit_counts["core/b.go"], 2);
        assert_eq!(output.churn_totals["core/b.go"], 69);
        assert_eq!(output.contributor_counts["core/b.go"].len(), 2);
        assert!(!output.commit_counts.contains_key("core/a.go"));
        assert!(!output.churn_totals.contains_key("core/a.go"));
    }

    #[test]
    fn rename_history_is_order_independent() {
        let log = "\
--c2|bob|2024-02-01T00:00:00Z
8\t1\tcore/{a.go => b.go}
--c1|alice|2024-01-01T00:00:00Z
50\t10\tcore/a.go
";
        let output = aggregate(log, &live(&["core/b.go"]));
        assert_eq!(output.commit_counts["core/b.go"], 2);
        assert_eq!(output.churn_totals["core/b.go"], 69);
        assert_eq!(
            output.first_commit_dates["core/b.go"],
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn chained_renames_reach_the_live_name() {
        let log = "\
--c1|alice|2024-01-01T00:00:00Z
3\t0\tlib/util.rs
--c2|alice|2024-02-01T00:00:00Z
0\t0\t{lib => src}/util.rs
--c3|alice|2024-03-01T00:00:00Z
1\t1\tsrc/{util.rs => helpers.rs}
";
        let output = aggregate(log, &live(&["src/helpers.rs"]));
        assert_eq!(output.commit_counts["src/helpers.rs"], 3);
        assert_eq!(output.churn_totals["src/helpers.rs"], 5);
        assert_eq!(output.paths().len(), 1);
    }

    #[test]
    fn log_naming_the_new_path_accumulates_both_commits() {
        let log = "\
--c1|alice|2024-01-01T00:00:00Z
50\t10\tcore/b.go
--c2|bob|2024-02-01T00:00:00Z
8\t1\tcore/a.go => core/b.go
";
        let output = aggregate(log, &live(&["core/b.go"]));
        assert_eq!(output.commit_counts["core/b.go"], 2);
        assert_eq!(output.churn_totals["core/b.go"], 69);
        assert!(!output.churn_totals.contains_key("core/a.go"));
        assert!(!output.contributor_counts.contains_key("core/a.go"));
    }

    #[test]
    fn undated_commit_counts_but_has_no_date_or_author() {
        let log = "--c1|alice|not-a-date\n4\t4\tsrc/x.rs\n";
        let output = aggregate(log, &live(&["src/x.rs"]));
        assert_eq!(output.commit_counts["src/x.rs"], 1);
        assert_eq!(output.churn_totals["src/x.rs"], 8);
        assert!(!output.first_commit_dates.contains_key("src/x.rs"));
        assert!(!output.last_commit_dates.contains_key("src/x.rs"));
        assert!(!output.contributor_counts.contains_key("src/x.rs"));
    }

    #[test]
    fn first_and_last_dates_ignore_log_order() {
        let log = "\
--c3|alice|2024-03-01T00:00:00Z
1\t0\tlib.rs
--c1|alice|2024-01-01T00:00:00Z
1\t0\tlib.rs
--c2|bob|2024-02-01T00:00:00Z
1\t0\tlib.rs
";
        let output = aggregate(log, &live(&["lib.rs"]));
        assert_eq!(
            output.first_commit_dates["lib.rs"],
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            output.last_commit_dates["lib.rs"],
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(output.contributor_counts["lib.rs"]["alice"], 2);
        assert_eq!(output.contributor_counts["lib.rs"]["bob"], 1);
    }

    #[test]
    fn binary_changes_count_commits_with_zero_churn() {
        let log = "--c1|alice|2024-01-01T00:00:00Z\n-\t-\tlogo.png\n";
        let output = aggregate(log, &live(&["logo.png"]));
        assert_eq!(output.commit_counts["logo.png"], 1);
        assert_eq!(output.churn_totals["logo.png"], 0);
    }

    #[test]
    fn dead_paths_are_never_recorded() {
        let log = "--c1|alice|2024-01-01T00:00:00Z\n3\t3\tgone.rs\n1\t1\tkept.rs\n";
        let output = aggregate(log, &live(&["kept.rs"]));
        assert_eq!(output.paths().into_iter().collect::<Vec<_>>(), vec!["kept.rs"]);
    }

    #[test]
    fn bidirectional_rename_double_counts_churn() {
        // Known behavior: when both sides are live, each receives the full churn.
        let log = "--c1|alice|2024-01-01T00:00:00Z\n6\t4\ta.go => b.go\n";
        let output = aggregate(log, &live(&["a.go", "b.go"]));
        assert_eq!(output.churn_totals["a.go"], 10);
        assert_eq!(output.churn_totals["b.go"], 10);
        assert_eq!(output.commit_counts["a.go"], 1);
        assert_eq!(output.commit_counts["b.go"], 1);
        assert_eq!(
            output.first_commit_dates["a.go"],
            output.first_commit_dates["b.go"]
        );
    }

    #[test]
    fn changes_before_any_header_are_anonymous() {
        let output = aggregate("2\t2\tsrc/a.rs\n", &live(&["src/a.rs"]));
        assert_eq!(output.commit_counts["src/a.rs"], 1);
        assert!(output.contributor_counts.is_empty());
    }

    #[test]
    fn payload_survives_json() {
        let log = "--c1|alice|2024-01-01T00:00:00Z\n2\t1\tsrc/a.rs\n";
        let output = aggregate(log, &live(&["src/a.rs"]));
        let json = serde_json::to_vec(&output).unwrap();
        let back: AggregateOutput = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, output);
    }
}

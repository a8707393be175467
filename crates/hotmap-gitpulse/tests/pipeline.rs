//! Integration test: log source → cache → aggregate → report.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use hotmap_cache::fingerprint::CacheFingerprint;
use hotmap_cache::manager::CacheManager;
use hotmap_cache::policy::CacheEntry;
use hotmap_cache::store::{CacheStore, MemoryStore};
use hotmap_core::{HotmapError, ScoreMode, TimeWindow};
use hotmap_gitpulse::files::GlobExcludes;
use hotmap_gitpulse::pipeline::{aggregate_activity, build_report, AnalysisRequest, Origin};
use hotmap_gitpulse::scoring::LineCounter;
use hotmap_gitpulse::source::{GitSource, LogSource, RepoIdentity};

const RENAME_LOG: &str = "\
--c1|alice|2024-01-01T00:00:00Z
50\t10\tcore/a.go
2\t2\tREADME.md

--c2|bob|2024-02-01T00:00:00Z
8\t1\tcore/{a.go => b.go}
4\t0\tdocs/guide.md
";

struct FakeSource {
    log: Result<String, String>,
    files: Vec<String>,
    log_calls: AtomicUsize,
}

impl FakeSource {
    fn new(log: &str, files: &[&str]) -> Self {
        Self {
            log: Ok(log.to_string()),
            files: files.iter().map(|f| f.to_string()).collect(),
            log_calls: AtomicUsize::new(0),
        }
    }

    fn broken(message: &str) -> Self {
        Self {
            log: Err(message.to_string()),
            files: Vec::new(),
            log_calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }
}

impl LogSource for FakeSource {
    fn log(&self, _repo: &Path, _reference: &str, _window: &TimeWindow) -> Result<String, HotmapError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        self.log.clone().map_err(HotmapError::Git)
    }

    fn files_at(&self, _repo: &Path, _reference: &str) -> Result<Vec<String>, HotmapError> {
        Ok(self.files.clone())
    }
}

struct FixedIdentity(Result<&'static str, ()>);

impl RepoIdentity for FixedIdentity {
    fn identity(&self, _repo: &Path, _reference: &str) -> Result<String, HotmapError> {
        self.0
            .map(str::to_string)
            .map_err(|_| HotmapError::Git("no HEAD".into()))
    }
}

struct Lines(u64);

impl LineCounter for Lines {
    fn count_lines(&self, _path: &str) -> Option<u64> {
        Some(self.0)
    }
}

fn request() -> AnalysisRequest {
    AnalysisRequest {
        repo: PathBuf::from("/repo"),
        reference: "HEAD".into(),
        window: TimeWindow::unbounded(),
        mode: ScoreMode::Hot,
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

#[test]
fn renamed_file_keeps_its_history_end_to_end() {
    let source = FakeSource::new(RENAME_LOG, &["core/b.go", "README.md", "docs/guide.md"]);
    let result = aggregate_activity(&request(), &source, &FixedIdentity(Ok("id")), None, now())
        .unwrap();

    assert_eq!(result.origin, Origin::Fresh);
    assert_eq!(result.output.commit_counts["core/b.go"], 2);
    assert_eq!(result.output.churn_totals["core/b.go"], 69);
    assert!(!result.output.commit_counts.contains_key("core/a.go"));

    let report = build_report(
        &result.output,
        ScoreMode::Hot,
        None,
        &GlobExcludes::new(&["*.md".into()]).unwrap(),
        &Lines(100),
        now(),
    );
    let paths: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["core/b.go"]);
    assert_eq!(report.files[0].owners, vec!["alice", "bob"]);
    assert_eq!(report.folders.len(), 1);
    assert_eq!(report.folders[0].path, "core");
}

#[test]
fn second_run_is_served_from_cache() {
    let cache = CacheManager::new(MemoryStore::new());
    let source = FakeSource::new(RENAME_LOG, &["core/b.go"]);
    let identity = FixedIdentity(Ok("repo@abc"));

    let first = aggregate_activity(&request(), &source, &identity, Some(&cache), now()).unwrap();
    let second = aggregate_activity(
        &request(),
        &source,
        &identity,
        Some(&cache),
        now() + Duration::hours(1),
    )
    .unwrap();

    assert_eq!(first.origin, Origin::Fresh);
    assert_eq!(second.origin, Origin::Cache);
    assert_eq!(second.output, first.output);
    assert_eq!(source.calls(), 1);
}

#[test]
fn different_mode_or_window_misses() {
    let cache = CacheManager::new(MemoryStore::new());
    let source = FakeSource::new(RENAME_LOG, &["core/b.go"]);
    let identity = FixedIdentity(Ok("repo@abc"));

    aggregate_activity(&request(), &source, &identity, Some(&cache), now()).unwrap();

    let mut risk = request();
    risk.mode = ScoreMode::Risk;
    aggregate_activity(&risk, &source, &identity, Some(&cache), now()).unwrap();

    let mut recent = request();
    recent.window = TimeWindow::last_days(30, now());
    aggregate_activity(&recent, &source, &identity, Some(&cache), now()).unwrap();

    assert_eq!(source.calls(), 3);
}

#[test]
fn entry_older_than_a_week_is_recomputed() {
    let cache = CacheManager::new(MemoryStore::new());
    let source = FakeSource::new(RENAME_LOG, &["core/b.go"]);
    let identity = FixedIdentity(Ok("repo@abc"));

    aggregate_activity(&request(), &source, &identity, Some(&cache), now()).unwrap();
    let later = now() + Duration::days(8);
    let result = aggregate_activity(&request(), &source, &identity, Some(&cache), later).unwrap();

    assert_eq!(result.origin, Origin::Fresh);
    assert_eq!(source.calls(), 2);

    // The recomputed entry replaced the stale one.
    let again = aggregate_activity(&request(), &source, &identity, Some(&cache), later).unwrap();
    assert_eq!(again.origin, Origin::Cache);
}

#[test]
fn undecodable_entry_is_recomputed_and_overwritten() {
    let identity = FixedIdentity(Ok("repo@abc"));
    let store = MemoryStore::new();
    let key = CacheFingerprint::derive("repo@abc", ScoreMode::Hot, &TimeWindow::unbounded());
    store
        .set(
            key.as_str(),
            &CacheEntry {
                payload: b"{\"commitCounts\": 7}".to_vec(),
                schema_version: hotmap_cache::policy::SCHEMA_VERSION,
                stored_at: now().timestamp(),
            },
        )
        .unwrap();
    let cache = CacheManager::new(store);
    let source = FakeSource::new(RENAME_LOG, &["core/b.go"]);

    let first = aggregate_activity(&request(), &source, &identity, Some(&cache), now()).unwrap();
    let second = aggregate_activity(&request(), &source, &identity, Some(&cache), now()).unwrap();

    assert_eq!(first.origin, Origin::Fresh);
    assert_eq!(second.origin, Origin::Cache);
}

#[test]
fn identity_failure_still_caches_under_empty_identity() {
    let cache = CacheManager::new(MemoryStore::new());
    let source = FakeSource::new(RENAME_LOG, &["core/b.go"]);
    let identity = FixedIdentity(Err(()));

    aggregate_activity(&request(), &source, &identity, Some(&cache), now()).unwrap();
    let second = aggregate_activity(&request(), &source, &identity, Some(&cache), now()).unwrap();

    assert_eq!(second.origin, Origin::Cache);
    assert_eq!(source.calls(), 1);
}

#[test]
fn closed_cache_degrades_to_fresh_runs() {
    let cache = CacheManager::new(MemoryStore::new());
    cache.close();
    let source = FakeSource::new(RENAME_LOG, &["core/b.go"]);

    let result = aggregate_activity(
        &request(),
        &source,
        &FixedIdentity(Ok("id")),
        Some(&cache),
        now(),
    )
    .unwrap();
    assert_eq!(result.origin, Origin::Fresh);
    assert_eq!(result.output.commit_counts["core/b.go"], 2);
}

#[test]
fn log_failure_is_fatal() {
    let cache = CacheManager::new(MemoryStore::new());
    let source = FakeSource::broken("fatal: not a git repository");

    let err = aggregate_activity(
        &request(),
        &source,
        &FixedIdentity(Ok("id")),
        Some(&cache),
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, HotmapError::Git(msg) if msg.contains("not a git repository")));
}

#[test]
fn path_filter_keeps_root_folder() {
    let source = FakeSource::new(RENAME_LOG, &["core/b.go", "README.md", "docs/guide.md"]);
    let result =
        aggregate_activity(&request(), &source, &FixedIdentity(Ok("id")), None, now()).unwrap();

    let unfiltered = build_report(
        &result.output,
        ScoreMode::Hot,
        None,
        &GlobExcludes::none(),
        &Lines(10),
        now(),
    );
    assert!(unfiltered.folders.iter().all(|f| f.path != "."));

    let filtered = build_report(
        &result.output,
        ScoreMode::Hot,
        Some("README"),
        &GlobExcludes::none(),
        &Lines(10),
        now(),
    );
    assert_eq!(filtered.files.len(), 1);
    assert_eq!(filtered.folders[0].path, ".");
}

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn commit_to(repo: &git2::Repository, update_ref: &str, files: &[(&str, &str)], message: &str) {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (path, content) in files {
        std::fs::write(workdir.join(path), content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = git2::Signature::now("alice", "alice@example.com").unwrap();
    let parent = repo
        .revparse_single(update_ref)
        .ok()
        .and_then(|o| o.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some(update_ref), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

#[test]
fn moving_the_analyzed_reference_invalidates_the_cache() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo = git2::Repository::init(dir.path()).unwrap();
    commit_to(&repo, "HEAD", &[("a.rs", "one\n")], "init");
    let tip = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("release", &tip, false).unwrap();

    let request = AnalysisRequest {
        repo: dir.path().to_path_buf(),
        reference: "release".into(),
        window: TimeWindow::unbounded(),
        mode: ScoreMode::Hot,
    };
    let git = GitSource::default();
    let cache = CacheManager::new(MemoryStore::new());

    let first = aggregate_activity(&request, &git, &git, Some(&cache), Utc::now()).unwrap();
    assert_eq!(first.output.commit_counts["a.rs"], 1);

    // HEAD stays put while the analyzed branch gains a commit.
    commit_to(&repo, "refs/heads/release", &[("a.rs", "one\ntwo\n")], "grow");

    let second = aggregate_activity(&request, &git, &git, Some(&cache), Utc::now()).unwrap();
    assert_eq!(second.origin, Origin::Fresh);
    assert_eq!(second.output.commit_counts["a.rs"], 2);
}

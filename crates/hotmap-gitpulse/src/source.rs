//! Repository collaborators: raw log text, reference file lists, identity.
//!
//! The log comes from the `git` binary because `--numstat -M` rename output
//! is what the parser understands. Tree listing and identity go through git2.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::SecondsFormat;
use git2::{ObjectType, Repository, TreeWalkMode, TreeWalkResult};
use hotmap_core::{HotmapError, TimeWindow};
use tracing::debug;

/// Pretty format producing `--<hash>|<author>|<date>` header lines.
pub const LOG_FORMAT: &str = "--%H|%an|%aI";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Supplies raw history text and the file list of a snapshot.
pub trait LogSource {
    /// `--numstat` log for `reference` restricted to `window`.
    fn log(&self, repo: &Path, reference: &str, window: &TimeWindow) -> Result<String, HotmapError>;

    /// Every file path present in the tree at `reference`.
    fn files_at(&self, repo: &Path, reference: &str) -> Result<Vec<String>, HotmapError>;
}

/// Names a repository state for cache keys.
pub trait RepoIdentity {
    /// Stable identity of the history `reference` names in `repo`.
    fn identity(&self, repo: &Path, reference: &str) -> Result<String, HotmapError>;
}

/// Default collaborator backed by the `git` CLI and git2.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use std::time::Duration;
/// use hotmap_core::TimeWindow;
/// use hotmap_gitpulse::source::{GitSource, LogSource};
///
/// let git = GitSource::new(Duration::from_secs(30));
/// let log = git.log(Path::new("."), "HEAD", &TimeWindow::unbounded()).unwrap();
/// let files = git.files_at(Path::new("."), "HEAD").unwrap();
/// println!("{} bytes of history over {} files", log.len(), files.len());
/// ```
#[derive(Debug, Clone)]
pub struct GitSource {
    timeout: Duration,
}

impl GitSource {
    /// Kill `git log` if it runs longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for GitSource {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Arguments passed to `git` for a log request.
///
/// # Examples
///
/// ```
/// use hotmap_core::TimeWindow;
/// use hotmap_gitpulse::source::log_args;
///
/// let args = log_args("main", &TimeWindow::unbounded());
/// assert!(args.contains(&"--numstat".to_string()));
/// assert_eq!(args.last().map(String::as_str), Some("main"));
/// ```
pub fn log_args(reference: &str, window: &TimeWindow) -> Vec<String> {
    let mut args = vec![
        "-c".to_string(),
        "core.quotepath=off".to_string(),
        "log".to_string(),
        "--numstat".to_string(),
        "-M".to_string(),
        "--no-color".to_string(),
        format!("--pretty=format:{LOG_FORMAT}"),
    ];
    if let Some(start) = window.start {
        args.push(format!(
            "--since={}",
            start.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    // `--until` is inclusive and the window end is not.
    if let Some(end) = window.end {
        let last = end - chrono::Duration::seconds(1);
        args.push(format!(
            "--until={}",
            last.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    args.push(reference.to_string());
    args
}

impl LogSource for GitSource {
    fn log(&self, repo: &Path, reference: &str, window: &TimeWindow) -> Result<String, HotmapError> {
        let mut child = Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(log_args(reference, window))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| HotmapError::Git(format!("failed to run git log: {e}")))?;

        // Drain both pipes while polling so a large log cannot fill them and stall git.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() > self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(HotmapError::Git(format!(
                        "git log timed out after {}s",
                        self.timeout.as_secs()
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(HotmapError::Git(format!("failed to wait for git log: {e}")));
                }
            }
        };

        let stdout = join(stdout)?;
        let stderr = join(stderr)?;
        if !status.success() {
            return Err(HotmapError::Git(format!(
                "git log failed ({status}): {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        debug!(
            bytes = stdout.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "read git log"
        );
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn files_at(&self, repo: &Path, reference: &str) -> Result<Vec<String>, HotmapError> {
        let repository = Repository::open(repo)
            .map_err(|e| HotmapError::Git(format!("failed to open repository: {e}")))?;
        let tree = repository
            .revparse_single(reference)
            .and_then(|object| object.peel_to_tree())
            .map_err(|e| HotmapError::Git(format!("failed to resolve '{reference}': {e}")))?;

        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    files.push(format!("{root}{name}"));
                }
            }
            TreeWalkResult::Ok
        })
        .map_err(|e| HotmapError::Git(format!("failed to walk tree: {e}")))?;

        Ok(files)
    }
}

impl RepoIdentity for GitSource {
    fn identity(&self, repo: &Path, reference: &str) -> Result<String, HotmapError> {
        let repository = Repository::open(repo)
            .map_err(|e| HotmapError::Git(format!("failed to open repository: {e}")))?;
        let commit = repository
            .revparse_single(reference)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| HotmapError::Git(format!("failed to resolve '{reference}': {e}")))?;
        let root = repository
            .workdir()
            .unwrap_or_else(|| repository.path())
            .to_string_lossy()
            .into_owned();
        Ok(format!("{root}@{}", commit.id()))
    }
}

type Drain = thread::JoinHandle<std::io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Drain> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join(handle: Option<Drain>) -> Result<Vec<u8>, HotmapError> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| HotmapError::Git("git output reader panicked".into()))?
            .map_err(|e| HotmapError::Git(format!("failed to read git output: {e}"))),
        None => Ok(Vec::new()),
    }
}

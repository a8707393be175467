//! Rename-aware attribution of numstat path specs.
//!
//! `git log --numstat -M` writes renames either as `old => new` or, when the
//! paths share a prefix or suffix, as `prefix{old => new}suffix`. Statistics
//! are attributed only to sides that still exist at the reference snapshot.

use std::collections::{HashMap, HashSet};

const ARROW: &str = " => ";

/// Paths present in the reference tree.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::rename::FileExistenceSet;
///
/// let live: FileExistenceSet = ["src/lib.rs", "README.md"].into_iter().collect();
/// assert!(live.contains("src/lib.rs"));
/// assert!(!live.contains("src/old.rs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileExistenceSet {
    paths: HashSet<String>,
}

impl FileExistenceSet {
    /// Whether `path` exists at the snapshot.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Number of live paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no path is live.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FromIterator<String> for FileExistenceSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for FileExistenceSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

/// A tokenized numstat path spec.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::rename::PathSpec;
///
/// assert_eq!(PathSpec::parse("src/a.rs"), PathSpec::Plain("src/a.rs"));
/// assert_eq!(
///     PathSpec::parse("src/{old => new}/mod.rs"),
///     PathSpec::Rename { old: "src/old/mod.rs".into(), new: "src/new/mod.rs".into() }
/// );
/// assert_eq!(PathSpec::parse("src/{old/mod.rs"), PathSpec::Malformed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec<'a> {
    /// An ordinary path.
    Plain(&'a str),
    /// A move from `old` to `new`.
    Rename {
        /// Path before the commit.
        old: String,
        /// Path after the commit.
        new: String,
    },
    /// A rename expression that cannot be reconstructed.
    Malformed,
}

impl<'a> PathSpec<'a> {
    /// Tokenize a path spec.
    pub fn parse(spec: &'a str) -> Self {
        if !spec.contains(ARROW) {
            return PathSpec::Plain(spec);
        }
        if spec.contains('{') || spec.contains('}') {
            return parse_braced(spec);
        }
        match spec.split_once(ARROW) {
            Some((old, new)) => PathSpec::Rename {
                old: old.to_string(),
                new: new.to_string(),
            },
            None => PathSpec::Malformed,
        }
    }
}

fn parse_braced(spec: &str) -> PathSpec<'_> {
    let Some(open) = spec.find('{') else {
        return PathSpec::Malformed;
    };
    let Some(close) = spec[open + 1..].find('}').map(|i| open + 1 + i) else {
        return PathSpec::Malformed;
    };
    let Some((old_mid, new_mid)) = spec[open + 1..close].split_once(ARROW) else {
        return PathSpec::Malformed;
    };
    let prefix = &spec[..open];
    let suffix = &spec[close + 1..];
    PathSpec::Rename {
        old: splice(prefix, old_mid, suffix),
        new: splice(prefix, new_mid, suffix),
    }
}

// `a/{ => b}/c` means `a/c` became `a/b/c`: an empty side must not leave `a//c`.
fn splice(prefix: &str, mid: &str, suffix: &str) -> String {
    if mid.is_empty() && (prefix.is_empty() || prefix.ends_with('/')) {
        if let Some(rest) = suffix.strip_prefix('/') {
            return format!("{prefix}{rest}");
        }
    }
    format!("{prefix}{mid}{suffix}")
}

/// Resolve `spec` to the live path(s) its statistics belong to.
///
/// For a rename both sides are checked independently, old side first. Both
/// are returned when both exist (a later commit restored the old path).
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::rename::{resolve, FileExistenceSet};
///
/// let live: FileExistenceSet = ["b.go"].into_iter().collect();
/// assert_eq!(resolve("a.go => b.go", &live), vec!["b.go".to_string()]);
/// assert!(resolve("a.go", &live).is_empty());
/// ```
pub fn resolve(spec: &str, live: &FileExistenceSet) -> Vec<String> {
    match PathSpec::parse(spec) {
        PathSpec::Plain(path) if live.contains(path) => vec![path.to_string()],
        PathSpec::Plain(_) | PathSpec::Malformed => Vec::new(),
        PathSpec::Rename { old, new } => {
            let mut paths = Vec::with_capacity(2);
            if live.contains(&old) {
                paths.push(old.clone());
            }
            if new != old && live.contains(&new) {
                paths.push(new);
            }
            paths
        }
    }
}

/// Old-to-new path moves seen anywhere in a log.
///
/// Lets changes recorded under a path that no longer exists follow the file
/// to its live name, whichever order the log lists commits in.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::rename::{FileExistenceSet, RenameTrail};
///
/// let mut trail = RenameTrail::default();
/// trail.record("lib/a.rs", "src/a.rs");
/// trail.record("src/a.rs", "src/core/a.rs");
///
/// let live: FileExistenceSet = ["src/core/a.rs"].into_iter().collect();
/// assert_eq!(trail.follow("lib/a.rs", &live), Some("src/core/a.rs"));
/// assert_eq!(trail.follow("docs/a.md", &live), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RenameTrail {
    moves: HashMap<String, String>,
}

impl RenameTrail {
    /// Remember that `old` became `new`. The first move recorded for `old` wins.
    pub fn record(&mut self, old: &str, new: &str) {
        if old != new {
            self.moves
                .entry(old.to_string())
                .or_insert_with(|| new.to_string());
        }
    }

    /// Walk the moves starting at `path` until a live path is reached.
    pub fn follow<'t>(&'t self, path: &str, live: &FileExistenceSet) -> Option<&'t str> {
        let mut current = self.moves.get(path)?;
        // Bounded by the number of moves, so a cycle cannot spin forever.
        for _ in 0..self.moves.len() {
            if live.contains(current) {
                return Some(current.as_str());
            }
            current = self.moves.get(current)?;
        }
        None
    }

    /// Number of recorded moves.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Whether no move was recorded.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

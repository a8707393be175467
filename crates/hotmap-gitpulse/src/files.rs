//! Candidate file list with prefix and exclusion filtering.

use hotmap_core::HotmapError;

use crate::aggregate::AggregateOutput;

/// Decides whether a repository path is left out of reports.
pub trait ExclusionMatcher {
    /// Whether `path` matches any exclusion rule.
    fn is_excluded(&self, path: &str) -> bool;
}

/// Glob-style exclusion rules.
///
/// A pattern containing `/` is matched against the whole path. A pattern
/// without `/` is also matched against every path component, so `vendor`
/// drops `vendor/lib.js` and `*.min.js` drops `web/app.min.js`. A trailing
/// `/` matches everything below that directory.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::files::{ExclusionMatcher, GlobExcludes};
///
/// let rules = GlobExcludes::new(&["vendor".into(), "*.lock".into(), "docs/".into()]).unwrap();
/// assert!(rules.is_excluded("vendor/github.com/x/y.go"));
/// assert!(rules.is_excluded("Cargo.lock"));
/// assert!(rules.is_excluded("docs/guide/intro.md"));
/// assert!(!rules.is_excluded("src/main.rs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct GlobExcludes {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: glob::Pattern,
    anchored: bool,
}

impl GlobExcludes {
    /// Compile `patterns` in order.
    ///
    /// # Errors
    ///
    /// Returns [`HotmapError::Config`] naming the first pattern that is not a valid glob.
    pub fn new(patterns: &[String]) -> Result<Self, HotmapError> {
        let mut rules = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (source, anchored) = match trimmed.strip_suffix('/') {
                Some(dir) => (format!("{dir}/**"), true),
                None => (trimmed.to_string(), trimmed.contains('/')),
            };
            let pattern = glob::Pattern::new(&source).map_err(|e| {
                HotmapError::Config(format!("invalid exclude pattern '{raw}': {e}"))
            })?;
            rules.push(Rule { pattern, anchored });
        }
        Ok(Self { rules })
    }

    /// Rules that exclude nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ExclusionMatcher for GlobExcludes {
    fn is_excluded(&self, path: &str) -> bool {
        self.rules.iter().any(|rule| {
            rule.pattern.matches(path)
                || (!rule.anchored && path.split('/').any(|part| rule.pattern.matches(part)))
        })
    }
}

/// Collect every path with any statistic, then apply the filters.
///
/// `path_prefix` keeps only paths starting with it (an empty prefix keeps
/// everything). `excludes` drops any matching path. The result is sorted.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::aggregate::AggregateOutput;
/// use hotmap_gitpulse::files::{build_file_list, GlobExcludes};
///
/// let mut output = AggregateOutput::default();
/// output.commit_counts.insert("src/a.rs".into(), 2);
/// output.churn_totals.insert("src/gen.pb.rs".into(), 10);
/// output.commit_counts.insert("README.md".into(), 1);
///
/// let excludes = GlobExcludes::new(&["*.pb.rs".into()]).unwrap();
/// assert_eq!(build_file_list(&output, Some("src/"), &excludes), vec!["src/a.rs"]);
/// ```
pub fn build_file_list(
    output: &AggregateOutput,
    path_prefix: Option<&str>,
    excludes: &dyn ExclusionMatcher,
) -> Vec<String> {
    let prefix = path_prefix.filter(|p| !p.is_empty());
    output
        .paths()
        .into_iter()
        .filter(|path| prefix.map_or(true, |p| path.starts_with(p)))
        .filter(|path| !excludes.is_excluded(path))
        .map(str::to_string)
        .collect()
}

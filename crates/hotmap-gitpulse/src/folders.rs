//! Roll file scores up into their parent directories.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::scoring::FileResult;

/// Folder name used for files at the repository root.
pub const ROOT_FOLDER: &str = ".";

/// Owners listed per folder.
pub const MAX_FOLDER_OWNERS: usize = 2;

/// Aggregated activity for one directory.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::folders::FolderResult;
///
/// let folder = FolderResult {
///     path: "src/auth".into(),
///     files: 3,
///     commits: 40,
///     churn: 1200,
///     total_loc: 230,
///     weighted_score_sum: 19000.0,
///     score: 82.6,
///     owners: vec!["alice".into()],
/// };
/// assert_eq!(folder.owners.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderResult {
    /// Directory path, `.` for the repository root.
    pub path: String,
    /// Files scored in this directory.
    pub files: u64,
    /// Sum of file commits.
    pub commits: u64,
    /// Sum of file churn.
    pub churn: u64,
    /// Sum of file line counts.
    pub total_loc: u64,
    /// Sum of file score times file line count.
    pub weighted_score_sum: f64,
    /// Line-weighted mean file score, 0 when the folder has no lines.
    pub score: f64,
    /// Top primary owners by commits.
    pub owners: Vec<String>,
}

#[derive(Default)]
struct FolderTally {
    files: u64,
    commits: u64,
    churn: u64,
    total_loc: u64,
    weighted_score_sum: f64,
    // Insertion order doubles as the tie-break.
    owners: Vec<(String, u64)>,
}

impl FolderTally {
    fn add(&mut self, file: &FileResult) {
        self.files += 1;
        self.commits += file.commits;
        self.churn += file.churn;
        self.total_loc += file.lines_of_code;
        self.weighted_score_sum += file.mode_score * file.lines_of_code as f64;

        if let Some(owner) = file.primary_owner() {
            match self.owners.iter_mut().find(|(name, _)| name == owner) {
                Some((_, tally)) => *tally += file.commits,
                None => self.owners.push((owner.to_string(), file.commits)),
            }
        }
    }

    fn finish(mut self, path: String) -> FolderResult {
        let score = if self.total_loc > 0 {
            self.weighted_score_sum / self.total_loc as f64
        } else {
            0.0
        };
        // Stable, so equal tallies keep first-seen order.
        self.owners.sort_by(|a, b| b.1.cmp(&a.1));
        FolderResult {
            path,
            files: self.files,
            commits: self.commits,
            churn: self.churn,
            total_loc: self.total_loc,
            weighted_score_sum: self.weighted_score_sum,
            score,
            owners: self
                .owners
                .into_iter()
                .take(MAX_FOLDER_OWNERS)
                .map(|(name, _)| name)
                .collect(),
        }
    }
}

/// Parent directory of a repository path, `.` at the root.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::folders::parent_folder;
///
/// assert_eq!(parent_folder("a/b/c.go"), "a/b");
/// assert_eq!(parent_folder("c.go"), ".");
/// ```
pub fn parent_folder(path: &str) -> String {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
        _ => ROOT_FOLDER.to_string(),
    }
}

/// Group `files` by parent directory and score each folder.
///
/// The root folder is reported only when `path_filter_active` is set.
/// Results are sorted by score descending, then by path.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::folders::score_folders;
/// use hotmap_gitpulse::scoring::FileResult;
///
/// let file = |path: &str, score: f64, loc: u64| FileResult {
///     path: path.into(),
///     commits: 1,
///     churn: 1,
///     lines_of_code: loc,
///     mode_score: score,
///     owners: vec![],
///     contributors: 0,
///     age_days: 0,
///     last_change_days: None,
/// };
/// let files = vec![file("svc/a.go", 85.0, 100), file("svc/b.go", 75.0, 80), file("svc/c.go", 90.0, 50)];
///
/// let folders = score_folders(&files, false);
/// assert_eq!(folders[0].total_loc, 230);
/// assert!((folders[0].score - 82.61).abs() < 0.01);
/// ```
pub fn score_folders(files: &[FileResult], path_filter_active: bool) -> Vec<FolderResult> {
    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, FolderTally> = HashMap::new();

    for file in files {
        let folder = parent_folder(&file.path);
        if folder == ROOT_FOLDER && !path_filter_active {
            continue;
        }
        if !tallies.contains_key(&folder) {
            order.push(folder.clone());
        }
        tallies.entry(folder).or_default().add(file);
    }

    let mut folders: Vec<FolderResult> = order
        .into_iter()
        .filter_map(|path| tallies.remove(&path).map(|tally| tally.finish(path)))
        .collect();

    folders.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
    folders
}

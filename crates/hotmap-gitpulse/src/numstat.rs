//! Line-oriented parser for `git log --numstat` text.
//!
//! The log grammar has two line kinds:
//!
//! ```text
//! --<hash>|<author>|<RFC 3339 date>
//! <additions>\t<deletions>\t<path spec>
//! ```
//!
//! Malformed input never aborts parsing. Each field that may degrade goes
//! through one of the lenient helpers at the bottom of this module.

use chrono::{DateTime, Utc};

/// Metadata for one commit.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::numstat::CommitHeader;
///
/// let anon = CommitHeader::anonymous();
/// assert!(anon.author.is_empty());
/// assert!(anon.date.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHeader {
    /// Author name, empty when the header was unusable.
    pub author: String,
    /// Author date. `None` is never used for ordering.
    pub date: Option<DateTime<Utc>>,
}

impl CommitHeader {
    /// Header for commits whose metadata could not be read.
    pub fn anonymous() -> Self {
        Self {
            author: String::new(),
            date: None,
        }
    }
}

/// One `--numstat` row.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::numstat::FileChangeLine;
///
/// let line = FileChangeLine { additions: 50, deletions: 10, path_spec: "core/a.go".into() };
/// assert_eq!(line.churn(), 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeLine {
    /// Lines added; unknown counts are 0.
    pub additions: u64,
    /// Lines deleted; unknown counts are 0.
    pub deletions: u64,
    /// Plain path or rename expression.
    pub path_spec: String,
}

impl FileChangeLine {
    /// Lines added plus lines deleted.
    pub fn churn(&self) -> u64 {
        self.additions.saturating_add(self.deletions)
    }
}

/// A parsed log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Start of a commit; following changes belong to it.
    Commit(CommitHeader),
    /// A file touched by the current commit.
    Change(FileChangeLine),
}

/// Streaming parser over raw log text.
///
/// # Examples
///
/// ```
/// use hotmap_gitpulse::numstat::{parse_log, LogRecord};
///
/// let log = "--abc|alice|2024-01-02T03:04:05Z\n3\t1\tsrc/lib.rs\n";
/// let records: Vec<_> = parse_log(log).collect();
/// assert_eq!(records.len(), 2);
/// assert!(matches!(&records[1], LogRecord::Change(c) if c.churn() == 4));
/// ```
pub struct LogParser<'a> {
    lines: std::str::Lines<'a>,
    skipped: usize,
}

/// Parse `text` lazily into [`LogRecord`]s.
pub fn parse_log(text: &str) -> LogParser<'_> {
    LogParser {
        lines: text.lines(),
        skipped: 0,
    }
}

impl LogParser<'_> {
    /// Non-blank lines discarded so far because they fit neither line kind.
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }
}

impl Iterator for LogParser<'_> {
    type Item = LogRecord;

    fn next(&mut self) -> Option<LogRecord> {
        loop {
            let line = clean_line(self.lines.next()?);
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix("--") {
                return Some(LogRecord::Commit(parse_header(header)));
            }
            match parse_change(line) {
                Some(change) => return Some(LogRecord::Change(change)),
                None => self.skipped += 1,
            }
        }
    }
}

fn clean_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'')
}

fn parse_header(header: &str) -> CommitHeader {
    let mut fields = header.splitn(3, '|');
    let (Some(_hash), Some(author), Some(date)) = (fields.next(), fields.next(), fields.next())
    else {
        return CommitHeader::anonymous();
    };
    // Author and date only count together: a commit without a usable date
    // must not feed the contributor histogram either.
    match date_or_none(date) {
        Some(date) => CommitHeader {
            author: author.trim().to_string(),
            date: Some(date),
        },
        None => CommitHeader::anonymous(),
    }
}

fn parse_change(line: &str) -> Option<FileChangeLine> {
    let mut fields = line.splitn(3, '\t');
    let additions = fields.next()?;
    let deletions = fields.next()?;
    let path_spec = fields.next()?;
    Some(FileChangeLine {
        additions: count_or_zero(additions),
        deletions: count_or_zero(deletions),
        path_spec: path_spec.trim().to_string(),
    })
}

/// Line count column. Degrades to 0 for `-` (binary), negative, or
/// non-numeric tokens so churn stays a lower bound instead of failing.
fn count_or_zero(token: &str) -> u64 {
    token.trim().parse().unwrap_or(0)
}

/// Commit date column. Degrades to `None`; callers must skip date-derived stats.
fn date_or_none(token: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(token.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn changes(text: &str) -> Vec<FileChangeLine> {
        parse_log(text)
            .filter_map(|r| match r {
                LogRecord::Change(c) => Some(c),
                LogRecord::Commit(_) => None,
            })
            .collect()
    }

    fn headers(text: &str) -> Vec<CommitHeader> {
        parse_log(text)
            .filter_map(|r| match r {
                LogRecord::Commit(h) => Some(h),
                LogRecord::Change(_) => None,
            })
            .collect()
    }

    #[test]
    fn parses_header_fields() {
        let parsed = headers("--9f1c|Ada Lovelace|2024-05-01T10:00:00+02:00");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].author, "Ada Lovelace");
        assert_eq!(
            parsed[0].date,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn header_with_too_few_fields_is_anonymous() {
        assert_eq!(headers("--9f1c|alice"), vec![CommitHeader::anonymous()]);
    }

    #[test]
    fn header_with_bad_date_is_anonymous() {
        assert_eq!(
            headers("--9f1c|alice|yesterday"),
            vec![CommitHeader::anonymous()]
        );
    }

    #[test]
    fn quotes_whitespace_and_carriage_returns_are_stripped() {
        let log = "  '--9f1c|bob|2024-01-01T00:00:00Z'\r\n\"5\t2\tsrc/main.rs\"\r\n";
        let records: Vec<_> = parse_log(log).collect();
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], LogRecord::Commit(h) if h.author == "bob"));
        assert_eq!(
            records[1],
            LogRecord::Change(FileChangeLine {
                additions: 5,
                deletions: 2,
                path_spec: "src/main.rs".into(),
            })
        );
    }

    #[test]
    fn binary_marker_counts_as_zero() {
        let parsed = changes("-\t-\tassets/logo.png\n-\t7\tmixed.bin\n");
        assert_eq!(parsed[0].churn(), 0);
        assert_eq!(parsed[1].additions, 0);
        assert_eq!(parsed[1].deletions, 7);
    }

    #[test]
    fn negative_and_garbage_counts_are_zero() {
        let parsed = changes("-4\tabc\tsrc/a.rs\n");
        assert_eq!(parsed[0].additions, 0);
        assert_eq!(parsed[0].deletions, 0);
    }

    #[test]
    fn short_file_lines_are_discarded() {
        let mut parser = parse_log("12\tsrc/a.rs\nnot a stat line\n1\t1\tsrc/b.rs\n");
        let records: Vec<_> = parser.by_ref().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(parser.skipped_lines(), 2);
    }

    #[test]
    fn blank_lines_are_separators() {
        let log = "--a|x|2024-01-01T00:00:00Z\n\n1\t0\ta.rs\n\n\n--b|y|2024-01-02T00:00:00Z\n2\t0\tb.rs\n";
        assert_eq!(parse_log(log).count(), 4);
    }

    #[test]
    fn tabs_inside_path_are_kept() {
        let parsed = changes("1\t1\tdocs/odd\tname.md\n");
        assert_eq!(parsed[0].path_spec, "docs/odd\tname.md");
    }
}

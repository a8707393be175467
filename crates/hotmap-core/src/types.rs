use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Weighting applied when turning per-file activity into a single score.
///
/// # Examples
///
/// ```
/// use hotmap_core::ScoreMode;
///
/// let mode: ScoreMode = "complexity".parse().unwrap();
/// assert_eq!(mode, ScoreMode::Complexity);
/// assert_eq!(mode.to_string(), "complexity");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    /// Frequently and heavily changed files.
    #[default]
    Hot,
    /// Busy files whose knowledge sits with few people.
    Risk,
    /// Large, old files that keep churning.
    Complexity,
    /// Large, old files nobody has touched recently.
    Stale,
}

impl ScoreMode {
    /// All modes, in display order.
    pub const ALL: [ScoreMode; 4] = [
        ScoreMode::Hot,
        ScoreMode::Risk,
        ScoreMode::Complexity,
        ScoreMode::Stale,
    ];
}

impl fmt::Display for ScoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreMode::Hot => write!(f, "hot"),
            ScoreMode::Risk => write!(f, "risk"),
            ScoreMode::Complexity => write!(f, "complexity"),
            ScoreMode::Stale => write!(f, "stale"),
        }
    }
}

impl FromStr for ScoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hot" => Ok(ScoreMode::Hot),
            "risk" => Ok(ScoreMode::Risk),
            "complexity" => Ok(ScoreMode::Complexity),
            "stale" => Ok(ScoreMode::Stale),
            other => Err(format!("unknown score mode: {other}")),
        }
    }
}

/// Half-open `[start, end)` query window over commit dates.
///
/// `None` on either side means unbounded.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use hotmap_core::TimeWindow;
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 15, 13, 45, 0).unwrap();
/// let window = TimeWindow::last_days(30, now);
/// assert_eq!(
///     window.start,
///     Some(Utc.with_ymd_and_hms(2024, 5, 16, 0, 0, 0).unwrap())
/// );
/// assert!(window.end.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// A window covering the whole history.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A window opening `days` before `now`, truncated to midnight UTC.
    ///
    /// Truncation keeps the window identical across runs on the same day so
    /// that cached aggregates remain addressable.
    pub fn last_days(days: u64, now: DateTime<Utc>) -> Self {
        let days = i64::try_from(days).unwrap_or(i64::MAX).min(365_000);
        let start = now - Duration::days(days);
        let midnight = start
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or(start);
        Self {
            start: Some(midnight),
            end: None,
        }
    }

    /// Whether `at` falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at < end)
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use hotmap_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn score_mode_round_trips_through_display() {
        for mode in ScoreMode::ALL {
            assert_eq!(mode.to_string().parse::<ScoreMode>().unwrap(), mode);
        }
        assert!("roi".parse::<ScoreMode>().is_err());
    }

    #[test]
    fn score_mode_deserializes_lowercase() {
        let mode: ScoreMode = serde_json::from_str("\"stale\"").unwrap();
        assert_eq!(mode, ScoreMode::Stale);
    }

    #[test]
    fn last_days_is_stable_within_a_day() {
        let morning = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 3, 10, 22, 30, 5).unwrap();
        assert_eq!(
            TimeWindow::last_days(7, morning),
            TimeWindow::last_days(7, evening)
        );
    }

    #[test]
    fn window_bounds_are_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let window = TimeWindow {
            start: Some(start),
            end: Some(end),
        };
        assert!(window.contains(start));
        assert!(!window.contains(end));
        assert!(TimeWindow::unbounded().contains(end));
    }
}

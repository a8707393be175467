use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hotmap_cache::manager::CacheManager;
use hotmap_cache::sqlite::SqliteStore;
use hotmap_core::{HotmapConfig, OutputFormat, ScoreMode, TimeWindow, CONFIG_TEMPLATE};
use hotmap_gitpulse::files::GlobExcludes;
use hotmap_gitpulse::pipeline::{aggregate_activity, build_report, AnalysisRequest, Origin};
use hotmap_gitpulse::scoring::WorkingTreeLines;
use hotmap_gitpulse::source::GitSource;

mod render;

const CONFIG_FILE: &str = ".hotmap.toml";

#[derive(Parser)]
#[command(
    name = "hotmap",
    version,
    about = "Git history hotspots for files and folders",
    long_about = "Hotmap mines `git log --numstat` and scores every live file by churn,\n\
                   ownership, and age. Renamed files keep their history.\n\n\
                   Examples:\n  \
                     hotmap files                      Hottest files in the last 180 days\n  \
                     hotmap files --mode risk          Busy files owned by few people\n  \
                     hotmap folders --filter src/      Folder roll-up under src/\n  \
                     hotmap files --start 2024-01-01   Everything since a date\n  \
                     hotmap init                       Write a .hotmap.toml template"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .hotmap.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable ranked list (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown table"
    )]
    format: OutputFormat,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Rank files by activity
    #[command(long_about = "Rank live files by git activity.\n\n\
        Modes:\n  \
          hot         commits, churn, and contributors\n  \
          risk        ownership concentration on busy files\n  \
          complexity  size, churn, and age\n  \
          stale       large, old files nobody touches\n\n\
        Examples:\n  hotmap files --mode hot --limit 10\n  hotmap files --exclude 'vendor/' --format json")]
    Files(AnalyzeArgs),
    /// Roll file scores up into folders
    #[command(long_about = "Roll file scores up into their parent folders.\n\n\
        A folder's score is the line-weighted mean of its files' scores. Files at the\n\
        repository root form the `.` folder, reported only when --filter is given.\n\n\
        Examples:\n  hotmap folders\n  hotmap folders --filter services/ --mode risk")]
    Folders(AnalyzeArgs),
    /// Create a default .hotmap.toml
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Repository path (default: current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Scoring mode: hot, risk, complexity, stale
    #[arg(long)]
    mode: Option<ScoreMode>,

    /// Time range in days, 0 for all history (default: 180)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    since: Option<u64>,

    /// Window start, YYYY-MM-DD or RFC 3339 (inclusive)
    #[arg(long)]
    start: Option<String>,

    /// Window end, YYYY-MM-DD or RFC 3339 (exclusive)
    #[arg(long)]
    end: Option<String>,

    /// Only report paths starting with this prefix
    #[arg(long)]
    filter: Option<String>,

    /// Glob pattern to exclude, repeatable (added to config excludes)
    #[arg(long)]
    exclude: Vec<String>,

    /// Maximum rows to show (default: 20)
    #[arg(long)]
    limit: Option<usize>,

    /// Reference whose tree lists the live files (default: HEAD)
    #[arg(long)]
    reference: Option<String>,

    /// Ignore and don't write the aggregate cache
    #[arg(long)]
    no_cache: bool,
}

#[derive(Clone, Copy)]
enum View {
    Files,
    Folders,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
        }
        Some(Command::Files(ref args)) => {
            analyze(args, &config, cli.format, View::Files)?;
        }
        Some(Command::Folders(ref args)) => {
            analyze(args, &config, cli.format, View::Folders)?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, CONFIG_TEMPLATE).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "hotmap", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<HotmapConfig> {
    let config = match explicit {
        Some(path) => HotmapConfig::from_file(path).into_diagnostic()?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                HotmapConfig::from_file(default_path).into_diagnostic()?
            } else {
                HotmapConfig::default()
            }
        }
    };
    Ok(config)
}

/// Composition root for `files` and `folders`: owns the cache handle for the run.
fn analyze(args: &AnalyzeArgs, config: &HotmapConfig, format: OutputFormat, view: View) -> Result<()> {
    let root = repository_root(&args.path)?;

    let cache = if config.cache.enabled && !args.no_cache {
        open_cache(&root, &config.cache.path)
    } else {
        None
    };
    let result = run_report(args, &root, config, format, view, cache.as_ref());
    if let Some(cache) = cache {
        cache.close();
    }
    result
}

/// Working tree root of the repository containing `path`.
fn repository_root(path: &Path) -> Result<PathBuf> {
    let repository = git2::Repository::discover(path).map_err(|_| {
        miette::miette!(
            help = "Run hotmap from inside a git repository, or specify --path to one",
            "Not a git repository: {}",
            path.display()
        )
    })?;
    match repository.workdir() {
        Some(workdir) => Ok(workdir.to_path_buf()),
        None => miette::bail!(miette::miette!(
            help = "Line counts need a checkout; point --path at a non-bare clone",
            "Bare repository: {}",
            path.display()
        )),
    }
}

fn open_cache(repo: &Path, configured: &Path) -> Option<CacheManager> {
    let path = if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        repo.join(configured)
    };
    match SqliteStore::open(&path) {
        Ok(store) => {
            debug!(path = %path.display(), "opened aggregate cache");
            Some(CacheManager::new(store))
        }
        Err(e) => {
            warn!(error = %e, "aggregate cache unavailable, continuing without it");
            None
        }
    }
}

fn run_report(
    args: &AnalyzeArgs,
    root: &Path,
    config: &HotmapConfig,
    format: OutputFormat,
    view: View,
    cache: Option<&CacheManager>,
) -> Result<()> {
    let analysis = &config.analysis;
    let now = Utc::now();

    let mode = args.mode.unwrap_or(analysis.mode);
    let window = resolve_window(args, analysis.since_days, now)?;
    let path_filter = args.filter.clone().or_else(|| analysis.path_filter.clone());
    let limit = args.limit.unwrap_or(analysis.limit);

    let mut patterns = analysis.excludes.clone();
    patterns.extend(args.exclude.iter().cloned());
    let excludes = GlobExcludes::new(&patterns).into_diagnostic()?;

    let request = AnalysisRequest {
        repo: root.to_path_buf(),
        reference: args
            .reference
            .clone()
            .unwrap_or_else(|| analysis.reference.clone()),
        window,
        mode,
    };
    let git = GitSource::new(Duration::from_secs(analysis.log_timeout_secs));

    let spinner = if std::io::stderr().is_terminal() {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Mining git history at {}...", root.display()));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let aggregated = aggregate_activity(&request, &git, &git, cache, now).map_err(|e| {
        if let Some(pb) = &spinner {
            pb.finish_and_clear();
        }
        miette::miette!("{e}")
    })?;

    if let Some(pb) = spinner {
        let origin = match aggregated.origin {
            Origin::Cache => "cached",
            Origin::Fresh => "mined",
        };
        pb.finish_with_message(format!(
            "{} files with activity ({origin})",
            aggregated.output.commit_counts.len()
        ));
    }

    let lines = WorkingTreeLines::new(root);
    let report = build_report(
        &aggregated.output,
        mode,
        path_filter.as_deref(),
        &excludes,
        &lines,
        now,
    );

    let rendered = match view {
        View::Files => render::files(&report, limit, format),
        View::Folders => render::folders(&report, limit, format),
    }
    .into_diagnostic()?;
    print!("{rendered}");
    Ok(())
}

fn resolve_window(args: &AnalyzeArgs, since_days: u64, now: DateTime<Utc>) -> Result<TimeWindow> {
    if args.start.is_some() || args.end.is_some() {
        let start = args.start.as_deref().map(parse_date).transpose()?;
        let end = args.end.as_deref().map(parse_date).transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                miette::bail!(miette::miette!(
                    help = "--start must be earlier than --end",
                    "Empty time window: {start} .. {end}"
                ));
            }
        }
        return Ok(TimeWindow { start, end });
    }

    let days = args.since.unwrap_or(since_days);
    if days == 0 {
        Ok(TimeWindow::unbounded())
    } else {
        Ok(TimeWindow::last_days(days, now))
    }
}

fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| {
            miette::miette!(
                help = "Use YYYY-MM-DD or an RFC 3339 timestamp",
                "Invalid date: {value}"
            )
        })
}

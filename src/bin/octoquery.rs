//! octoquery: format SQL/JPQL inside annotation literals and .sql files.
//!
//! # Usage
//!
//! ```bash
//! # Format a source tree in place
//! octoquery fmt src/
//!
//! # CI: fail when anything would change
//! octoquery fmt --check src/ queries/
//!
//! # Format one query from stdin
//! echo "select a from t where b = 1" | octoquery query
//!
//! # Projection interface from a SELECT list
//! octoquery projection UserSummary --package com.acme.dto "select u.id as id from users u"
//! ```

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use octoquery::prelude::*;
use octoquery::projection;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

/// Directories never descended into while collecting files.
const SKIP_DIRS: &[&str] = &[
    "target",
    ".git",
    "node_modules",
    "build",
    ".gradle",
    "__pycache__",
];

#[derive(Parser)]
#[command(name = "octoquery")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "🐙 Formatter for SQL/JPQL in @Query annotations and .sql files", long_about = None)]
#[command(after_help = "EXAMPLES:
    octoquery fmt src/main/java              # Rewrite files in place
    octoquery fmt --check --diff src/        # Show what would change
    octoquery query 'select a from t'        # Format one query
    octoquery projection UserView 'select u.id as id from users u'")]
struct Cli {
    #[command(flatten)]
    style: StyleArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the config file.
#[derive(Args)]
struct StyleArgs {
    /// Config file (default: ./octoquery.toml, then the user config dir)
    #[arg(long, global = true, env = "OCTOQUERY_CONFIG")]
    config: Option<PathBuf>,

    /// Spaces per indentation level
    #[arg(long, global = true)]
    indent_width: Option<usize>,

    /// Keyword casing
    #[arg(long, global = true, value_enum)]
    keyword_case: Option<CliKeywordCase>,

    /// Preferred maximum line width
    #[arg(long, global = true)]
    max_line_width: Option<usize>,

    /// Keep JOINs on the FROM line
    #[arg(long, global = true)]
    no_join_per_line: bool,

    /// Rewrite multi-line Java string literals as text blocks
    #[arg(long, global = true)]
    promote_text_blocks: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliKeywordCase {
    Preserve,
    Upper,
    Lower,
}

impl From<CliKeywordCase> for KeywordCase {
    fn from(val: CliKeywordCase) -> Self {
        match val {
            CliKeywordCase::Preserve => KeywordCase::Preserve,
            CliKeywordCase::Upper => KeywordCase::Upper,
            CliKeywordCase::Lower => KeywordCase::Lower,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliDialect {
    Jpql,
    Native,
}

impl From<CliDialect> for Dialect {
    fn from(val: CliDialect) -> Self {
        match val {
            CliDialect::Jpql => Dialect::Jpql,
            CliDialect::Native => Dialect::Native,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Format .java, .kt, .kts, .py and .sql files in place
    Fmt {
        /// Files or directories (walked recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Don't write; exit with 1 when a file would change
        #[arg(long)]
        check: bool,
        /// Print the changed lines
        #[arg(long)]
        diff: bool,
        /// Print edits and diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Format a single query given as argument or on stdin
    Query {
        sql: Option<String>,
        /// Query language
        #[arg(short, long, value_enum, default_value = "native")]
        dialect: CliDialect,
    },
    /// Generate a projection interface from a SELECT list
    Projection {
        /// Interface name
        name: String,
        /// Java package of the interface
        #[arg(short, long)]
        package: Option<String>,
        /// SQL (read from stdin when omitted)
        sql: Option<String>,
    },
}

struct Settings {
    format: FormatConfig,
    annotations: AnnotationSet,
}

struct FileReport {
    path: PathBuf,
    original: String,
    outcome: FormatOutcome,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    path: &'a Path,
    changed: bool,
    #[serde(flatten)]
    outcome: &'a FormatOutcome,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("OCTOQUERY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let settings = load_settings(&cli.style)?;
    match cli.command {
        Commands::Fmt {
            paths,
            check,
            diff,
            json,
        } => format_files(&paths, settings, check, diff, json).await,
        Commands::Query { sql, dialect } => {
            let sql = read_input(sql)?;
            let formatted = format_query(&sql, dialect.into(), &settings.format)?;
            println!("{}", formatted);
            Ok(0)
        }
        Commands::Projection { name, package, sql } => {
            let sql = read_input(sql)?;
            let source = projection::projection(&sql, &name, package.as_deref())?;
            println!("{}", source);
            Ok(0)
        }
    }
}

fn load_settings(style: &StyleArgs) -> Result<Settings> {
    let file = ConfigFile::discover(style.config.as_deref()).context("loading configuration")?;
    let mut format = file.format;
    if let Some(width) = style.indent_width {
        format.indent_width = width;
    }
    if let Some(case) = style.keyword_case {
        format.keyword_case = case.into();
    }
    if let Some(width) = style.max_line_width {
        format.max_line_width = width;
    }
    if style.no_join_per_line {
        format.one_join_per_line = false;
    }
    if style.promote_text_blocks {
        format.promote_text_blocks = true;
    }
    format.validate()?;
    Ok(Settings {
        format,
        annotations: file.annotations,
    })
}

fn read_input(arg: Option<String>) -> Result<String> {
    match arg {
        Some(sql) => Ok(sql),
        None => {
            let mut sql = String::new();
            std::io::stdin()
                .read_to_string(&mut sql)
                .context("reading stdin")?;
            Ok(sql)
        }
    }
}

fn is_supported(path: &Path) -> bool {
    SourceMode::for_path(path, &AnnotationSet::default()).is_some()
}

/// Expand directories into the supported files below them.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk_dir(path, &mut files)?;
        } else if path.is_file() {
            if is_supported(path) {
                files.push(path.clone());
            } else {
                tracing::warn!(path = %path.display(), "unsupported file type, skipping");
            }
        } else {
            bail!("no such file or directory: {}", path.display());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let skip = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| SKIP_DIRS.contains(&n));
            if !skip {
                walk_dir(&path, files)?;
            }
        } else if is_supported(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn process_file(id: u64, path: PathBuf, settings: &Settings, write: bool) -> Result<FileReport> {
    let original = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let Some(mode) = SourceMode::for_path(&path, &settings.annotations) else {
        bail!("unsupported file type: {}", path.display());
    };

    let buffer = SourceBuffer::new(BufferId(id), &original);
    let outcome = format_source(&buffer, &mode, &settings.format);
    if write && !outcome.is_unchanged() {
        let formatted = apply_edits(&original, &outcome.edits)?;
        std::fs::write(&path, formatted).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(FileReport {
        path,
        original,
        outcome,
    })
}

async fn format_files(
    paths: &[PathBuf],
    settings: Settings,
    check: bool,
    diff: bool,
    json: bool,
) -> Result<i32> {
    let files = collect_files(paths)?;
    let settings = Arc::new(settings);
    let write = !check;

    let mut set = JoinSet::new();
    for (id, path) in files.into_iter().enumerate() {
        let settings = Arc::clone(&settings);
        set.spawn_blocking(move || process_file(id as u64, path, &settings, write));
    }

    let mut reports = Vec::new();
    while let Some(joined) = set.join_next().await {
        reports.push(joined.context("formatter task failed")??);
    }
    reports.sort_by(|a, b| a.path.cmp(&b.path));

    let changed = reports.iter().filter(|r| !r.outcome.is_unchanged()).count();
    if json {
        let out: Vec<JsonReport> = reports
            .iter()
            .map(|r| JsonReport {
                path: &r.path,
                changed: !r.outcome.is_unchanged(),
                outcome: &r.outcome,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for report in &reports {
            print_report(report, check, diff);
        }
        let verb = if check { "would reformat" } else { "reformatted" };
        println!(
            "{} {} {} file(s), {} unchanged",
            "✓".green(),
            verb,
            changed,
            reports.len() - changed
        );
    }

    Ok(if check && changed > 0 { 1 } else { 0 })
}

fn print_report(report: &FileReport, check: bool, diff: bool) {
    let path = report.path.display();
    if !report.outcome.is_unchanged() {
        let label = if check { "Would reformat:" } else { "Reformatted:" };
        println!("{} {}", label.yellow().bold(), path);
        if diff {
            for edit in &report.outcome.edits {
                print_edit(&report.original, edit);
            }
        }
    }
    for diagnostic in &report.outcome.diagnostics {
        let (line, column) = line_col(&report.original, diagnostic.span.start);
        let kind = serde_json::to_value(diagnostic.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        eprintln!(
            "{} {}:{}:{} {} {}",
            "warning:".yellow().bold(),
            path,
            line,
            column,
            kind.dimmed(),
            diagnostic.message
        );
    }
}

/// 1-based line and column of a byte offset.
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(before.len(), |i| before.len() - i - 1) + 1;
    (line, column)
}

/// Whole lines touched by an edit, before and after.
fn print_edit(original: &str, edit: &FormattingEdit) {
    let start = original[..edit.span.start].rfind('\n').map_or(0, |i| i + 1);
    let end = original[edit.span.end..]
        .find('\n')
        .map_or(original.len(), |i| edit.span.end + i);
    let before = &original[start..end];
    let after = format!(
        "{}{}{}",
        &original[start..edit.span.start],
        edit.replacement,
        &original[edit.span.end..end]
    );

    let (line, _) = line_col(original, start);
    println!("{}", format!("@@ line {} @@", line).cyan());
    for l in before.lines() {
        println!("{}", format!("-{}", l).red());
    }
    for l in after.lines() {
        println!("{}", format!("+{}", l).green());
    }
}

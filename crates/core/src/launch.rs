//! Command-line entry: decides which windows to open before any UI exists.

use clap::Parser;
use mdview_protocol::FontId;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "mdview")]
#[command(about = "A native Markdown viewer", long_about = None)]
pub struct Cli {
    /// Font for the windows opened now: system, inter, serif, sans, mono or readable
    #[arg(short, long, value_name = "NAME", value_parser = parse_font)]
    pub font: Option<FontId>,

    /// Markdown files to open, one window each
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

fn parse_font(name: &str) -> Result<FontId, mdview_protocol::UnknownFont> {
    name.parse()
}

/// A listed file that will not get a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchFailure {
    /// As typed on the command line.
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for LaunchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mdview: {}: {}", self.path.display(), self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Also covers `--help`, which clap reports through its error type.
    #[error(transparent)]
    Usage(#[from] clap::Error),
    #[error("missing file argument")]
    MissingFile,
    #[error("none of the listed files could be opened")]
    NothingToOpen { failures: Vec<LaunchFailure> },
}

impl LaunchError {
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::Usage(e) if !e.use_stderr() => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Applies to the windows opened at launch only.
    pub font: Option<FontId>,
    /// Canonical paths, one window each. Empty means one empty window.
    pub files: Vec<PathBuf>,
    pub failures: Vec<LaunchFailure>,
}

impl LaunchPlan {
    /// Exit status once the application quits.
    pub fn exit_code(&self) -> i32 {
        if self.failures.is_empty() { 0 } else { 1 }
    }
}

fn check_file(path: &Path, cwd: &Path) -> Result<PathBuf, String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    let canonical = absolute.canonicalize().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => "no such file".to_string(),
        _ => e.to_string(),
    })?;
    if !canonical.is_file() {
        return Err("not a regular file".to_string());
    }
    Ok(canonical)
}

/// Parse `args` (including the program name) and check every listed file.
pub fn plan_launch<I, T>(args: I, cwd: &Path) -> Result<LaunchPlan, LaunchError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    // Started from Finder or a desktop entry.
    if args.len() <= 1 {
        return Ok(LaunchPlan::default());
    }

    let cli = Cli::try_parse_from(args)?;
    if cli.files.is_empty() {
        return Err(LaunchError::MissingFile);
    }

    let mut plan = LaunchPlan {
        font: cli.font,
        ..LaunchPlan::default()
    };
    for path in cli.files {
        match check_file(&path, cwd) {
            Ok(canonical) => plan.files.push(canonical),
            Err(reason) => plan.failures.push(LaunchFailure { path, reason }),
        }
    }

    if plan.files.is_empty() {
        return Err(LaunchError::NothingToOpen {
            failures: plan.failures,
        });
    }
    Ok(plan)
}

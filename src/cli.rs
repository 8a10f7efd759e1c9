//! Command-line interface.
//!
//! This module handles:
//! - Argument parsing
//! - Configuration loading and CLI overrides
//! - Destination defaulting
//! - Running the organizer with progress and summary output
//! - Writing the optional JSON report

use crate::config::Config;
use crate::error::{Error, OrganizeError};
use crate::file_organizer::{Organizer, RunReport};
use crate::output::OutputFormatter;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Sort a directory into photo, video, audio, program and other folders,
/// skipping duplicate files and renaming photos and videos by date.
#[derive(Debug, Clone, Parser)]
#[command(name = "media-sorter", version)]
pub struct Cli {
    /// Directory to sort. It is read, never modified.
    pub source: PathBuf,

    /// Output directory [default: `sorted_media` next to SOURCE]
    pub dest: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show what would happen without copying anything
    #[arg(long)]
    pub dry_run: bool,

    /// Worker threads (overrides the configuration file)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Write a JSON report of the run to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Log every file (debug level)
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Log level implied by the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

/// Resolves the destination directory.
///
/// An explicit destination wins; otherwise the destination is a sibling of
/// the source named `dest_dir_name`.
pub fn resolve_destination(source: &Path, dest: Option<&Path>, dest_dir_name: &str) -> PathBuf {
    if let Some(dest) = dest {
        return dest.to_path_buf();
    }
    let source = std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
    source
        .parent()
        .map(|parent| parent.join(dest_dir_name))
        .unwrap_or_else(|| source.join(dest_dir_name))
}

/// Runs the CLI application.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use media_sorter::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["media-sorter", "/home/user/Downloads"]);
/// match run_cli(&cli) {
///     Ok(report) => println!("{} files copied", report.copied_count()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<RunReport, Error> {
    let config = Config::load(cli.config.as_deref())?;
    let filters = config.compile_filters()?;

    if !cli.source.is_dir() {
        let path = cli.source.clone();
        return Err(if cli.source.exists() {
            OrganizeError::SourceNotDirectory { path }
        } else {
            OrganizeError::SourceMissing { path }
        }
        .into());
    }

    let destination = resolve_destination(
        &cli.source,
        cli.dest.as_deref(),
        &config.organize.dest_dir_name,
    );
    let jobs = cli.jobs.unwrap_or(config.organize.jobs);

    if cli.dry_run {
        OutputFormatter::dry_run_notice(&format!(
            "Analyzing {} -> {}",
            cli.source.display(),
            destination.display()
        ));
    } else {
        OutputFormatter::info(&format!(
            "Sorting {} -> {}",
            cli.source.display(),
            destination.display()
        ));
    }

    let organizer = Organizer::new(&cli.source, destination)
        .with_filters(filters)
        .jobs(jobs)
        .dry_run(cli.dry_run);

    let pb = OutputFormatter::create_progress_bar();
    let report = organizer
        .organize_with_progress(|total, outcome| OutputFormatter::track(&pb, total, outcome));
    pb.finish_and_clear();
    let report = report?;

    OutputFormatter::summary_table(&report);
    OutputFormatter::failure_list(&report);

    if let Some(path) = &cli.report {
        report.save(path).map_err(|source| Error::Report {
            path: path.clone(),
            source,
        })?;
        OutputFormatter::info(&format!("Report written to {}", path.display()));
    }

    if report.has_failures() {
        OutputFormatter::warning("Some files could not be copied. See the list above.");
    } else if cli.dry_run {
        OutputFormatter::success("Dry run complete. No files were copied.");
    } else {
        OutputFormatter::success("Sorting complete.");
    }

    Ok(report)
}

//! Terminal output.
//!
//! Colored status lines, the progress bar and the end-of-run summary table.
//! Structured per-file events go through `tracing`; this module only renders
//! what a person at the terminal needs to see.

use crate::file_category::Category;
use crate::file_organizer::{FileOutcome, RunReport};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Renders CLI output with consistent styling.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for file processing.
    ///
    /// The length is set as soon as the file count is known.
    pub fn create_progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Advances `pb` for one settled file.
    pub fn track(pb: &ProgressBar, total: usize, outcome: &FileOutcome) {
        pb.set_length(total as u64);
        if let Some(name) = outcome.source().file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        pb.inc(1);
    }

    /// Prints the per-category summary table for a run.
    pub fn summary_table(report: &RunReport) {
        Self::header(if report.dry_run {
            "SUMMARY (dry run)"
        } else {
            "SUMMARY"
        });

        let counts = report.category_counts();
        let width = Category::ALL
            .iter()
            .map(|c| c.dir_name().len())
            .max()
            .unwrap_or(0)
            .max(8);

        println!(
            "{:<width$} | {:>7} | {:>10} | {:>6}",
            "Category".bold(),
            "Copied".bold(),
            "Duplicates".bold(),
            "Failed".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 34));

        for category in Category::ALL {
            let row = counts.get(&category).copied().unwrap_or_default();
            println!(
                "{:<width$} | {:>7} | {:>10} | {:>6}",
                category.dir_name(),
                row.copied.to_string().green(),
                row.duplicates.to_string().yellow(),
                failed_cell(row.failed),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 34));
        println!(
            "{:<width$} | {:>7} | {:>10} | {:>6}",
            "Total".bold(),
            report.copied_count().to_string().green().bold(),
            report.duplicate_count().to_string().yellow().bold(),
            failed_cell(report.failed_count()).bold(),
            width = width
        );
    }

    /// Lists every failed file with its reason.
    pub fn failure_list(report: &RunReport) {
        if !report.has_failures() {
            return;
        }
        Self::header("FAILURES");
        for (path, reason) in report.failures() {
            Self::error(&format!("{}: {}", path.display(), reason));
        }
    }
}

fn failed_cell(count: usize) -> ColoredString {
    if count == 0 {
        count.to_string().normal()
    } else {
        count.to_string().red()
    }
}

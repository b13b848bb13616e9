//! Output formatting and styling module.
//!
//! Provides a centralized interface for user-facing CLI output: coloured
//! status lines, the progress bar shown while the inbox is processed, and the
//! end-of-run summary. Diagnostics go through `tracing` instead.

use crate::action::ActionStatus;
use crate::pipeline::{FileOutcome, RunReport};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Status lines (✓ success, ✗ error, ⚠ warning, cyan info)
/// - Dry-run notices
/// - The progress bar shown while the inbox is processed
/// - Per-entry listings and the category summary table
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortbox::output::OutputFormatter;
    /// OutputFormatter::success("Inbox sorted.");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// Goes to stderr so it stays visible when stdout carries a JSON report.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortbox::output::OutputFormatter;
    /// OutputFormatter::error("cannot read inbox /home/user/Downloads");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortbox::output::OutputFormatter;
    /// OutputFormatter::warning("notes.bin: no matching category, left in place");
    /// ```
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    ///
    /// # Arguments
    ///
    /// * `header` - The header text
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message, prefixed with `[DRY RUN]`.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar over `total` inbox entries.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of entries to process; the pipeline resets it once
    ///   the inbox has been listed
    ///
    /// # Returns
    ///
    /// A styled `ProgressBar` ready for use.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortbox::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints one line per processed entry.
    ///
    /// Moved and would-move entries are shown with their destination,
    /// unclassified entries as warnings and failed moves as errors.
    ///
    /// # Arguments
    ///
    /// * `report` - The finished run
    pub fn entries(report: &RunReport) {
        for entry in &report.entries {
            match &entry.outcome {
                FileOutcome::Moved {
                    category,
                    destination,
                    renamed,
                    action,
                } => {
                    let mut line = format!("{} → {}", entry.name, destination.display());
                    if *renamed {
                        line.push_str(" (renamed)");
                    }
                    Self::success(&format!("[{}] {}", category, line));
                    if *action == ActionStatus::Error {
                        Self::warning(&format!("{}: follow-up action failed", entry.name));
                    }
                }
                FileOutcome::WouldMove {
                    category,
                    destination,
                    renamed,
                } => {
                    let mut line =
                        format!("[{}] {} → {}", category, entry.name, destination.display());
                    if *renamed {
                        line.push_str(" (renamed)");
                    }
                    Self::dry_run_notice(&line)
                }
                FileOutcome::Unclassified => {
                    Self::warning(&format!("{}: no matching category, left in place", entry.name))
                }
                FileOutcome::MoveFailed { category, reason } => {
                    Self::error(&format!("[{}] {}: {}", category, entry.name, reason))
                }
            }
        }
    }

    /// Prints a summary table of sorted files by category.
    ///
    /// Unclassified entries get their own row when there are any.
    ///
    /// # Arguments
    ///
    /// * `report` - The finished run
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortbox::cli::{Cli, run_cli};
    /// use sortbox::output::OutputFormatter;
    ///
    /// let cli = Cli { dry_run: true, json: true, ..Cli::default() };
    /// if let Ok(report) = run_cli(&cli) {
    ///     OutputFormatter::summary_table(&report);
    /// }
    /// ```
    pub fn summary_table(report: &RunReport) {
        Self::header("SUMMARY");

        let counts = report.category_counts();
        let max_category_len = counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(12); // At least "Unclassified" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in &counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = max_category_len
            );
        }

        let unclassified = report.unclassified().count();
        if unclassified > 0 {
            println!(
                "{:<width$} | {} {}",
                "Unclassified",
                unclassified.to_string().yellow(),
                plural(unclassified),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        let total = report.sorted_count();
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural(total),
            width = max_category_len
        );
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(1), "file");
        assert_eq!(plural(0), "files");
        assert_eq!(plural(7), "files");
    }

    #[test]
    fn test_progress_bar_length() {
        let pb = OutputFormatter::create_progress_bar(5);
        assert_eq!(pb.length(), Some(5));
    }
}

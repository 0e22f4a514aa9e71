//! Console output for the binary.
//!
//! Log events go through `tracing`; this module only renders the
//! human-facing parts: the banner, fatal errors, progress bars and the
//! end-of-run summary table.

use crate::logger::RunSummary;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
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
    /// use sloth::output::OutputFormatter;
    /// OutputFormatter::success("All rules completed.");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sloth::output::OutputFormatter;
    /// OutputFormatter::error("Configuration error: config.json not found");
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
    /// use sloth::output::OutputFormatter;
    /// OutputFormatter::warning("Some files could not be processed");
    /// ```
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Startup banner.
    ///
    /// # Arguments
    ///
    /// * `dry_run` - Whether to announce that nothing will be moved or deleted
    pub fn banner(dry_run: bool) {
        println!("{}", "SLOTH".bold());
        println!("{}", "-".repeat(22));
        if dry_run {
            Self::dry_run_notice("simulation only: no file will be moved or deleted");
        }
    }

    /// Creates a progress bar for one rule's dispatch.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of files queued for the rule
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sloth::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    /// Prints the end-of-run counters as a two-column table.
    ///
    /// # Arguments
    ///
    /// * `summary` - Counters returned by `AppLogger::summary`
    pub fn summary_table(summary: &RunSummary) {
        Self::header(if summary.dry_run {
            "SUMMARY (dry run)"
        } else {
            "SUMMARY"
        });

        let rows = [
            ("Rules", summary.rules.to_string().green()),
            ("Files", summary.files.to_string().green()),
            ("Warnings", Self::highlight(summary.warnings, |s| s.yellow())),
            ("Errors", Self::highlight(summary.errors, |s| s.red())),
            (
                "Elapsed",
                format!("{:.2}s", summary.elapsed.as_secs_f64()).normal(),
            ),
        ];
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

        println!("{}", "-".repeat(width + 12));
        for (label, value) in rows {
            println!("{:<width$} | {}", label.bold(), value, width = width);
        }
        println!("{}", "-".repeat(width + 12));
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    fn highlight(count: u64, paint: fn(ColoredString) -> ColoredString) -> ColoredString {
        let text = count.to_string().normal();
        if count == 0 { text.green() } else { paint(text) }
    }
}

//! Terminal output for the CLI.
//!
//! All user-facing text goes through [`OutputFormatter`]; diagnostics go
//! through `tracing`.

use crate::analyze::FolderAnalysis;
use crate::organizer::{Progress, RunReport};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Colored message helpers and progress display.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use tidyfold::output::OutputFormatter;
    /// OutputFormatter::success("Configuration written");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark, to stderr.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidyfold::output::OutputFormatter;
    /// OutputFormatter::error("Target folder does not exist");
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
    /// use tidyfold::output::OutputFormatter;
    /// OutputFormatter::warning("2 files could not be processed.");
    /// ```
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidyfold::output::OutputFormatter;
    /// OutputFormatter::info("Organizing contents of: /home/user/Downloads");
    /// ```
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a message without styling.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a bold section header preceded by a blank line.
    ///
    /// # Arguments
    ///
    /// * `header` - The header text
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for a run.
    ///
    /// The length starts at zero; the first
    /// [`update_progress`](Self::update_progress) call sets it to the
    /// number of files in the run's snapshot.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidyfold::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar();
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    /// Moves `pb` to the file an organizer is about to process.
    ///
    /// # Arguments
    ///
    /// * `pb` - A bar from [`create_progress_bar`](Self::create_progress_bar)
    /// * `progress` - The update passed to the organizer's progress callback
    pub fn update_progress(pb: &ProgressBar, progress: Progress<'_>) {
        pb.set_length(progress.total as u64);
        pb.set_position(progress.index as u64);
        if let Some(name) = progress.path.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
    }

    /// Prints a finished run, highlighting errors when there are any.
    ///
    /// Dry runs are prefixed with a notice that nothing was modified.
    ///
    /// # Arguments
    ///
    /// * `report` - The report returned by [`Organizer::run`](crate::organizer::Organizer::run)
    pub fn run_report(report: &RunReport) {
        if let RunReport::DryRun(_) = report {
            Self::dry_run_notice("No files were modified.");
        }
        println!("\n{}", report);

        match report.errors().len() {
            0 => Self::success("Done."),
            n => Self::warning(&format!(
                "{} {} could not be processed.",
                n,
                if n == 1 { "file" } else { "files" }
            )),
        }
    }

    /// Prints the totals and extension table of an analysis.
    ///
    /// # Arguments
    ///
    /// * `analysis` - The result of [`analyze_folder`](crate::analyze::analyze_folder)
    pub fn analysis_table(analysis: &FolderAnalysis) {
        Self::header(&format!("ANALYSIS of {}", analysis.target_folder.display()));
        println!("{}", analysis);
    }

    /// Prints a yellow message prefixed with `[DRY RUN]`.
    ///
    /// # Arguments
    ///
    /// * `message` - The dry-run message
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

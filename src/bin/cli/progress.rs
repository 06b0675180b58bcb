//! Progress bar implementation for CLI operations.

use dsarc::AtomicProgress;
use dsarc::progress::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Progress display for CLI operations
///
/// Also carries the Ctrl+C flag, so every command polls it through
/// [`ProgressReporter::should_cancel`].
pub struct CliProgress {
    bar: ProgressBar,
    cancel: Arc<AtomicProgress>,
    warnings: Vec<String>,
    quiet: bool,
}

impl CliProgress {
    /// Creates a new progress display; `total` may grow later
    pub fn new(total: u64, quiet: bool, cancel: Arc<AtomicProgress>) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            pb.set_style(style);
            pb
        };

        Self {
            bar,
            cancel,
            warnings: Vec::new(),
            quiet,
        }
    }

    /// Sets a message on the progress bar
    pub fn set_message(&self, msg: impl Into<String>) {
        if !self.quiet {
            self.bar.set_message(msg.into());
        }
    }

    /// Finishes the progress display
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Finishes with a custom message
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.bar.finish_with_message(msg.into());
    }

    /// Warnings reported so far
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl ProgressReporter for CliProgress {
    fn on_total(&mut self, total: u64) {
        self.bar.set_length(total);
    }

    fn on_progress(&mut self, completed: u64, total: u64) -> bool {
        self.bar.set_length(total);
        self.bar.set_position(completed);
        !self.cancel.is_cancelled()
    }

    fn on_entry_start(&mut self, entry_name: &str, _size: u64) {
        if self.quiet {
            return;
        }

        // Truncate long names
        let chars: Vec<char> = entry_name.chars().collect();
        let display_name = if chars.len() > 40 {
            let tail: String = chars[chars.len() - 37..].iter().collect();
            format!("...{tail}")
        } else {
            entry_name.to_string()
        };
        self.bar.set_message(display_name);
    }

    fn on_entry_complete(&mut self, entry_name: &str, success: bool) {
        if !success && !self.quiet {
            self.bar.println(format!("  failed: {entry_name}"));
        }
    }

    fn on_warning(&mut self, message: &str) {
        if self.quiet {
            eprintln!("warning: {message}");
        } else {
            self.bar.println(format!("warning: {message}"));
        }
        self.warnings.push(message.to_string());
    }

    fn should_cancel(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

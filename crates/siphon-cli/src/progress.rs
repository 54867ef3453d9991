//! Progress rendering for long-running imports
//!
//! Renders the pipeline's status channel as an overwrite-in-place spinner
//! line: `update` replaces the line, `println` and `warn` print durable lines
//! above it.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use siphon_ingest::progress::ProgressReporter;

/// Terminal reporter backed by an indicatif spinner
pub struct TerminalProgress {
    spinner: ProgressBar,
}

impl TerminalProgress {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { spinner }
    }

    /// Clear the status line once the run completes
    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TerminalProgress {
    fn update(&self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    fn println(&self, message: &str) {
        self.spinner.println(message);
    }

    fn warn(&self, message: &str) {
        self.spinner.println(format!("{} {}", "!".yellow().bold(), message));
    }
}

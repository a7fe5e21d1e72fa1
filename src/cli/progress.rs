//! Job progress display.

use indicatif::{ProgressBar, ProgressStyle};
use pcapingest_core::job::{JobStatus, JobStatusView};

/// Progress bar driven by polled job status.
pub struct JobProgress {
    bar: ProgressBar,
}

impl JobProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        bar.set_message("Queued");
        Self { bar }
    }

    pub fn update(&self, status: &JobStatusView) {
        self.bar.set_position(status.progress as u64);
        if let Some(message) = &status.message {
            self.bar.set_message(message.clone());
        }
        self.bar.tick();
    }

    pub fn finish(&self, status: &JobStatusView) {
        let message = status.message.clone().unwrap_or_else(|| status.status.to_string());
        if status.status == JobStatus::Completed {
            self.bar.set_position(100);
            self.bar.finish_with_message(message);
        } else {
            self.bar.abandon_with_message(message);
        }
    }
}

impl Default for JobProgress {
    fn default() -> Self {
        Self::new()
    }
}

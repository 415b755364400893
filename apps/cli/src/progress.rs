//! Interactive progress reporter backed by an indicatif bar.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;

use linkpost_core::{ErrorTally, ProgressReporter, PublishOption};
use linkpost_shared::LinkpostError;

#[derive(Debug, Default)]
struct Buffered {
    errors: Vec<String>,
    warnings: Vec<(String, String)>,
    tally: ErrorTally,
}

/// Draws a bar sized to the expected item count.
///
/// Errors and warnings are buffered and printed after the bar finishes, so
/// they never tear the bar while units of work are running.
pub(crate) struct DisplayProgress {
    prefix: String,
    bar: ProgressBar,
    bytes: ProgressBar,
    visible: bool,
    buffered: Mutex<Buffered>,
}

impl DisplayProgress {
    pub(crate) fn new(prefix: impl Into<String>, max_errors: usize) -> Self {
        Self::build(prefix.into(), max_errors, true)
    }

    /// A reporter that never draws (for tests and non-terminal output).
    #[cfg(test)]
    pub(crate) fn hidden(prefix: impl Into<String>, max_errors: usize) -> Self {
        Self::build(prefix.into(), max_errors, false)
    }

    fn build(prefix: String, max_errors: usize, visible: bool) -> Self {
        let bar = ProgressBar::hidden();
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        let bytes = ProgressBar::hidden();
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.cyan} [{bar:40.green/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
        ) {
            bytes.set_style(style.progress_chars("=> "));
        }
        Self {
            prefix,
            bar,
            bytes,
            visible,
            buffered: Mutex::new(Buffered {
                tally: ErrorTally::new(max_errors),
                ..Buffered::default()
            }),
        }
    }

    /// Buffered lines, in the order they will be printed at completion.
    fn pending_lines(&self) -> Vec<String> {
        let buffered = self.buffered.lock();
        buffered
            .errors
            .iter()
            .map(|e| format!("{}{e}", self.prefix))
            .chain(
                buffered
                    .warnings
                    .iter()
                    .map(|(code, message)| format!("{}{code} {message}", self.prefix)),
            )
            .collect()
    }

    fn clear_pending(&self) {
        let mut buffered = self.buffered.lock();
        buffered.errors.clear();
        buffered.warnings.clear();
    }
}

impl ProgressReporter for DisplayProgress {
    fn start_activity(&self, summary: &str, expected_items: usize) {
        println!("{}{summary}", self.prefix);
        self.bar.set_length(expected_items as u64);
        self.bar.set_position(0);
        if self.visible {
            self.bar.set_draw_target(ProgressDrawTarget::stderr());
            self.bar.enable_steady_tick(std::time::Duration::from_millis(120));
        }
    }

    fn increment(&self) {
        self.bar.inc(1);
    }

    fn increment_by(&self, n: usize) {
        self.bar.inc(n as u64);
    }

    fn complete_activity(&self, summary: &str) {
        self.bar.finish_and_clear();
        println!("{}{summary}", self.prefix);
        for line in self.pending_lines() {
            println!("{line}");
        }
        self.clear_pending();
    }

    fn report_error(&self, error: &LinkpostError) -> bool {
        let mut buffered = self.buffered.lock();
        buffered.errors.push(error.to_string());
        buffered.tally.record()
    }

    fn report_warning(&self, code: &str, message: &str) -> bool {
        self.buffered
            .lock()
            .warnings
            .push((code.to_string(), message.to_string()));
        true
    }

    fn max_errors_reached(&self) -> bool {
        self.buffered.lock().tally.exhausted()
    }

    fn start_byte_activity(&self, summary: &str, expected_bytes: Option<u64>) {
        if let Some(len) = expected_bytes {
            self.bytes.set_length(len);
        }
        self.bytes.set_position(0);
        self.bytes.set_message(summary.to_string());
        if self.visible {
            self.bytes.set_draw_target(ProgressDrawTarget::stderr());
        }
    }

    fn increment_bytes(&self, n: u64) {
        self.bytes.inc(n);
    }

    fn complete_byte_activity(&self) {
        self.bytes.finish_and_clear();
    }
}

impl PublishOption for DisplayProgress {
    fn progress_reporter(self: Arc<Self>) -> Option<Arc<dyn ProgressReporter>> {
        Some(self)
    }
}

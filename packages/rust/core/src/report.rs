//! Progress and error reporting for publish runs.

use parking_lot::Mutex;

use linkpost_shared::LinkpostError;

/// Observer for a bounded, long-running activity.
///
/// Reporters receive calls from concurrent units of work, so every
/// implementation guards its own mutable state.
pub trait ProgressReporter: Send + Sync {
    /// Called once, before any item is dispatched.
    fn start_activity(&self, summary: &str, expected_items: usize);
    /// Called once per visited item.
    fn increment(&self);
    fn increment_by(&self, n: usize);
    /// Called once, after every dispatched item has completed.
    fn complete_activity(&self, summary: &str);
    /// Record an error. Returns `true` while the error budget is not exhausted.
    fn report_error(&self, error: &LinkpostError) -> bool;
    /// Record a warning. Returns `true` to continue.
    fn report_warning(&self, code: &str, message: &str) -> bool;
    fn max_errors_reached(&self) -> bool;

    /// Called before a byte stream (the collection download) is read.
    /// `expected_bytes` is the stream length when known.
    fn start_byte_activity(&self, summary: &str, expected_bytes: Option<u64>);
    fn increment_bytes(&self, n: u64);
    fn complete_byte_activity(&self);
}

/// Error count against a maximum.
///
/// A maximum of 0 means unlimited. Otherwise the budget is exhausted once
/// the count is strictly greater than the maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorTally {
    max_errors: usize,
    reported: usize,
}

impl ErrorTally {
    pub fn new(max_errors: usize) -> Self {
        Self {
            max_errors,
            reported: 0,
        }
    }

    /// Count one error and return `true` while the budget holds.
    pub fn record(&mut self) -> bool {
        self.reported += 1;
        !self.exhausted()
    }

    pub fn exhausted(&self) -> bool {
        self.max_errors > 0 && self.reported > self.max_errors
    }

    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn max_errors(&self) -> usize {
        self.max_errors
    }
}

// ---------------------------------------------------------------------------
// Silent
// ---------------------------------------------------------------------------

/// No-op reporter for headless/test usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn start_activity(&self, _summary: &str, _expected_items: usize) {}
    fn increment(&self) {}
    fn increment_by(&self, _n: usize) {}
    fn complete_activity(&self, _summary: &str) {}
    fn report_error(&self, _error: &LinkpostError) -> bool {
        true
    }
    fn report_warning(&self, _code: &str, _message: &str) -> bool {
        true
    }
    fn max_errors_reached(&self) -> bool {
        false
    }
    fn start_byte_activity(&self, _summary: &str, _expected_bytes: Option<u64>) {}
    fn increment_bytes(&self, _n: u64) {}
    fn complete_byte_activity(&self) {}
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Prints start/complete lines and streams each error and warning as it arrives.
///
/// Only the number of errors is kept, not the errors themselves.
#[derive(Debug)]
pub struct SummaryProgress {
    prefix: String,
    tally: Mutex<ErrorTally>,
}

impl SummaryProgress {
    pub fn new(prefix: impl Into<String>, max_errors: usize) -> Self {
        Self {
            prefix: prefix.into(),
            tally: Mutex::new(ErrorTally::new(max_errors)),
        }
    }

    /// Errors counted so far.
    pub fn errors_reported(&self) -> usize {
        self.tally.lock().reported()
    }
}

impl ProgressReporter for SummaryProgress {
    fn start_activity(&self, summary: &str, _expected_items: usize) {
        println!("{}{summary}", self.prefix);
    }

    fn increment(&self) {}

    fn increment_by(&self, _n: usize) {}

    fn complete_activity(&self, summary: &str) {
        println!("{}{summary}", self.prefix);
    }

    fn report_error(&self, error: &LinkpostError) -> bool {
        let within_budget = self.tally.lock().record();
        println!("{}{error}", self.prefix);
        within_budget
    }

    fn report_warning(&self, code: &str, message: &str) -> bool {
        println!("{}{code} {message}", self.prefix);
        true
    }

    fn max_errors_reached(&self) -> bool {
        self.tally.lock().exhausted()
    }

    fn start_byte_activity(&self, summary: &str, _expected_bytes: Option<u64>) {
        println!("{}{summary}", self.prefix);
    }

    fn increment_bytes(&self, _n: u64) {}

    fn complete_byte_activity(&self) {}
}

//! Connection metrics
//!
//! Recorded through the `metrics` facade; nothing is exported unless the application
//! installs a recorder.

pub mod counters;
pub mod histograms;
pub mod labels;

use crate::Error;
use std::time::Instant;

/// Records the outcome of one connection attempt.
///
/// Each attempt gets exactly one outcome. An attempt dropped before an outcome was
/// recorded counts as cancelled.
pub(crate) struct AttemptRecorder {
    mode: &'static str,
    start: Instant,
    recorded: bool,
}

impl AttemptRecorder {
    /// Count the attempt and start the clock
    pub(crate) fn start(mode: &'static str) -> Self {
        counters::connect_attempt(mode);
        Self {
            mode,
            start: Instant::now(),
            recorded: false,
        }
    }

    pub(crate) fn succeeded(&mut self) {
        if std::mem::replace(&mut self.recorded, true) {
            return;
        }
        counters::connection_established(self.mode);
        histograms::handshake_duration(self.mode, self.start.elapsed().as_millis() as u64);
    }

    pub(crate) fn failed(&mut self, err: &Error) {
        if std::mem::replace(&mut self.recorded, true) {
            return;
        }
        counters::connect_failure(self.mode, labels::category(err));
    }

    /// Record a finished attempt and pass the result through
    pub(crate) fn finish<T>(&mut self, result: crate::Result<T>) -> crate::Result<T> {
        match &result {
            Ok(_) => self.succeeded(),
            Err(e) => self.failed(e),
        }
        result
    }
}

impl Drop for AttemptRecorder {
    fn drop(&mut self) {
        if !self.recorded {
            self.failed(&Error::Cancelled);
        }
    }
}

//! Metric label values

use crate::{Error, ErrorCategory};

/// Blocking connection mode
pub const MODE_BLOCKING: &str = "blocking";
/// Non-blocking connection mode
pub const MODE_NON_BLOCKING: &str = "non_blocking";

/// Failure category label for an error
pub fn category(err: &Error) -> &'static str {
    match err.category() {
        ErrorCategory::Configuration => "configuration",
        ErrorCategory::Connection => match err {
            Error::Authentication(_) => "authentication",
            Error::Tls(_) => "tls",
            Error::Protocol(_) => "protocol",
            _ => "connection",
        },
        ErrorCategory::Timeout => "timeout",
        ErrorCategory::Cancelled => "cancelled",
    }
}

//! Error types

use std::io;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors, raised by the resolver before any I/O happens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds a value outside its allowed domain
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The connection URL could not be parsed
    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),

    /// Two sources disagree in a way precedence rules cannot settle
    #[error("conflicting connection parameters: {0}")]
    Conflict(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Coarse error taxonomy exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or conflicting input, detected before any I/O
    Configuration,
    /// Network, TLS, protocol or authentication failure during the handshake
    Connection,
    /// The blocking path or the socket connect exceeded the configured timeout
    Timeout,
    /// A pending connection was cancelled before it resolved
    Cancelled,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Connection => write!(f, "connection"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Could not reach or talk to the server
    #[error("connection error: {0}")]
    Connection(String),

    /// Server rejected the credentials or the SCRAM exchange failed
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// TLS setup or handshake failure
    #[error("TLS error: {0}")]
    Tls(String),

    /// Server sent something the handshake did not expect
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation did not complete within the configured timeout
    #[error("could not connect to {host}:{port}, operation timed out")]
    Timeout {
        /// Target host
        host: String,
        /// Target port
        port: u16,
    },

    /// Pending connection was cancelled before it resolved
    #[error("connection attempt cancelled")]
    Cancelled,

    /// Peer closed the socket
    #[error("connection closed")]
    ConnectionClosed,

    /// Invalid state transition or use of a closed handle
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// What the caller expected
        expected: String,
        /// What was found
        actual: String,
    },

    /// Async runtime could not be used the way the call requires
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Underlying socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Map this error onto the public taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Configuration,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::Connection(_)
            | Error::Authentication(_)
            | Error::Tls(_)
            | Error::Protocol(_)
            | Error::ConnectionClosed
            | Error::InvalidState { .. }
            | Error::Runtime(_)
            | Error::Io(_) => ErrorCategory::Connection,
        }
    }

    /// Whether the error was raised before any socket was opened
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Whether the error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub(crate) fn timeout(host: &str, port: u16) -> Self {
        Error::Timeout {
            host: host.to_string(),
            port,
        }
    }
}

//! Connection configuration
//!
//! This module handles:
//! * Caller-facing parameters ([`ConnectParams`]), all optional
//! * Connection URL parsing ([`UrlInfo`])
//! * Resolution into the canonical, immutable [`ConnectionConfig`]
//!
//! Resolution is pure: it never touches the network or the filesystem.

mod params;
mod url;

pub use params::{resolve, ConnectParams};
pub use url::{UrlInfo, SCHEME};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default server host
pub const DEFAULT_HOST: &str = "localhost";
/// Default client driver port
pub const DEFAULT_PORT: u16 = 28015;
/// Default database
pub const DEFAULT_DB: &str = "test";
/// Default user
pub const DEFAULT_USER: &str = "admin";
/// Default password (no credential)
pub const DEFAULT_PASSWORD: &str = "";
/// Default timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// TLS parameters.
///
/// Plain data: certificate files are only read when a connection is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsParams {
    /// PEM file with the CA certificate(s) to trust (None = system roots)
    pub ca_certs: Option<PathBuf>,
    /// Name to verify the server certificate against (None = connection host)
    pub server_name: Option<String>,
}

impl TlsParams {
    /// TLS with system root certificates
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust the CA certificate(s) in the given PEM file
    pub fn ca_certs(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_certs = Some(path.into());
        self
    }

    /// Verify the server certificate against this name instead of the host
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}

/// Canonical connection configuration.
///
/// Only produced by [`resolve`] (or [`ConnectionConfig::default`]), so every instance
/// satisfies the field constraints: non-empty host, db and user, a port in
/// `1..=65535` and a positive timeout.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) db: String,
    pub(crate) user: String,
    pub(crate) password: String,
    pub(crate) timeout_secs: u64,
    pub(crate) tls: Option<TlsParams>,
}

impl ConnectionConfig {
    /// Resolve parameters into a canonical configuration
    pub fn resolve(params: ConnectParams) -> Result<Self, crate::ConfigError> {
        resolve(params)
    }

    /// Server host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Default database for queries
    pub fn db(&self) -> &str {
        &self.db
    }

    /// Username
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Password (empty when no credential is set)
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timeout in whole seconds
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// TLS parameters, `None` for plaintext
    pub fn tls(&self) -> Option<&TlsParams> {
        self.tls.as_ref()
    }

    /// Whether TLS will be used
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Convert back into fully explicit parameters.
    ///
    /// Resolving the result yields a configuration equal to `self`.
    pub fn to_params(&self) -> ConnectParams {
        ConnectParams {
            host: Some(self.host.clone()),
            port: Some(u32::from(self.port)),
            db: Some(self.db.clone()),
            user: Some(self.user.clone()),
            password: Some(self.password.clone()),
            timeout: Some(self.timeout_secs),
            ssl: self.tls.clone(),
            url: None,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            db: DEFAULT_DB.to_string(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tls: None,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() {
            "<none>"
        } else {
            "<redacted>"
        };
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("user", &self.user)
            .field("password", &password)
            .field("timeout_secs", &self.timeout_secs)
            .field("tls", &self.tls)
            .finish()
    }
}

/// Renders the configuration as a URL without the password
impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        write!(
            f,
            "{}{}@{}:{}/{}?timeout={}",
            SCHEME, self.user, host, self.port, self.db, self.timeout_secs
        )?;
        if let Some(tls) = &self.tls {
            match &tls.ca_certs {
                Some(path) => write!(f, "&ca_certs={}", path.display())?,
                None => write!(f, "&tls=true")?,
            }
        }
        Ok(())
    }
}

//! Caller-facing connection parameters and their resolution

use super::url::UrlInfo;
use super::{
    ConnectionConfig, TlsParams, DEFAULT_DB, DEFAULT_HOST, DEFAULT_PASSWORD, DEFAULT_PORT,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Connection parameters as supplied by the caller.
///
/// Every field is optional. A field set here always wins over the same field parsed
/// from `url`, and the URL wins over the default. Use [`ConnectParams::resolve`] to
/// validate and normalize them.
///
/// # Examples
///
/// ```
/// use reql_wire::ConnectParams;
///
/// let config = ConnectParams::new()
///     .url("rethinkdb://admin@db1:28015/blog")
///     .db("analytics")
///     .resolve()?;
///
/// assert_eq!(config.host(), "db1");
/// assert_eq!(config.db(), "analytics");
/// # Ok::<(), reql_wire::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectParams {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u32>,
    pub(crate) db: Option<String>,
    pub(crate) user: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) timeout: Option<u64>,
    pub(crate) ssl: Option<TlsParams>,
    pub(crate) url: Option<String>,
}

impl ConnectParams {
    /// Empty parameter set (everything defaults)
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse parameters from a JSON object such as
    /// `{"host": "db1", "port": 28015, "ssl": {"ca_certs": "/etc/ca.pem"}}`
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::invalid("params", e.to_string()))
    }

    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the server port (validated to `1..=65535` on resolve)
    pub fn port(mut self, port: u32) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the default database
    pub fn db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    /// Set the username
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the timeout in seconds (must be positive)
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Enable TLS with the given parameters
    pub fn ssl(mut self, tls: TlsParams) -> Self {
        self.ssl = Some(tls);
        self
    }

    /// Set a connection URL (`rethinkdb://...`)
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Validate and normalize into a [`ConnectionConfig`]
    pub fn resolve(self) -> Result<ConnectionConfig, ConfigError> {
        resolve(self)
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }
    Ok(value)
}

fn validate_host(host: String) -> Result<String, ConfigError> {
    let host = non_empty("host", host)?;
    if host.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(ConfigError::invalid(
            "host",
            format!("'{}' is not a valid host name or address", host),
        ));
    }
    Ok(host)
}

fn validate_port(port: u32) -> Result<u16, ConfigError> {
    u16::try_from(port)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| ConfigError::invalid("port", format!("{} is not in 1..=65535", port)))
}

fn validate_timeout(seconds: u64) -> Result<u64, ConfigError> {
    if seconds == 0 {
        return Err(ConfigError::invalid("timeout", "must be greater than zero"));
    }
    Ok(seconds)
}

/// Credentials travel as a pair: a URL password may not be combined with a different,
/// explicitly set user.
fn check_credentials(params: &ConnectParams, from_url: &UrlInfo) -> Result<(), ConfigError> {
    if let (Some(explicit_user), Some(url_user), Some(_)) =
        (&params.user, &from_url.user, &from_url.password)
    {
        if explicit_user != url_user && params.password.is_none() {
            return Err(ConfigError::Conflict(format!(
                "URL password belongs to user '{}' but user '{}' was set explicitly; \
                 set the password explicitly as well",
                url_user, explicit_user
            )));
        }
    }
    Ok(())
}

/// Resolve caller parameters into a canonical configuration.
///
/// Per field: explicitly set value, else URL value, else default. Pure function.
pub fn resolve(params: ConnectParams) -> Result<ConnectionConfig, ConfigError> {
    let from_url = match params.url.as_deref() {
        Some(url) => UrlInfo::parse(url)?,
        None => UrlInfo::default(),
    };

    check_credentials(&params, &from_url)?;

    let host = validate_host(
        params
            .host
            .or(from_url.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
    )?;

    let port = match params.port.or(from_url.port) {
        Some(port) => validate_port(port)?,
        None => DEFAULT_PORT,
    };

    let db = non_empty(
        "db",
        params
            .db
            .or(from_url.db.clone())
            .unwrap_or_else(|| DEFAULT_DB.to_string()),
    )?;

    let user = non_empty(
        "user",
        params
            .user
            .or(from_url.user.clone())
            .unwrap_or_else(|| DEFAULT_USER.to_string()),
    )?;

    let password = params
        .password
        .or(from_url.password.clone())
        .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

    let timeout_secs = validate_timeout(
        params
            .timeout
            .or(from_url.timeout)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    )?;

    let tls = params.ssl.or_else(|| from_url.tls_params());
    if let Some(name) = tls.as_ref().and_then(|t| t.server_name.as_deref()) {
        if name.is_empty() {
            return Err(ConfigError::invalid("ssl.server_name", "must not be empty"));
        }
    }

    Ok(ConnectionConfig {
        host,
        port,
        db,
        user,
        password,
        timeout_secs,
        tls,
    })
}

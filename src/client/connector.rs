//! Connection factory

use super::mode::{Blocking, Mode, NonBlocking};
use super::pending::PendingConnection;
use crate::config::{resolve, ConnectParams, ConnectionConfig};
use crate::connection::BlockingConnection;
use crate::metrics::counters;
use crate::{ConfigError, Result};

/// Open a blocking connection.
///
/// Returns only once the handshake has completed or failed. The whole establishment
/// is bounded by the configured timeout.
///
/// # Errors
///
/// - [`Error::Config`](crate::Error::Config) for invalid parameters, before any socket
///   is opened
/// - [`Error::Timeout`](crate::Error::Timeout) if the handshake does not complete in
///   time
/// - [`Error::Runtime`](crate::Error::Runtime) when called from inside an async runtime
/// - a connection-class error otherwise
///
/// # Examples
///
/// ```no_run
/// use reql_wire::ConnectParams;
///
/// let conn = reql_wire::connect(ConnectParams::new().host("db1").port(28015))?;
/// assert!(conn.is_open());
/// # Ok::<(), reql_wire::Error>(())
/// ```
pub fn connect(params: ConnectParams) -> Result<BlockingConnection> {
    connect_with(params, Blocking)
}

/// Start a non-blocking connection.
///
/// Never blocks: parameters are validated synchronously, then a lazy
/// [`PendingConnection`] is returned. Configuration errors are reported here, not
/// through the future.
pub fn connect_async(params: ConnectParams) -> Result<PendingConnection> {
    connect_with(params, NonBlocking)
}

/// Connect in the given mode. The handle type is fixed by the mode.
///
/// ```no_run
/// use reql_wire::{Blocking, ConnectParams, NonBlocking};
///
/// let conn = reql_wire::connect_with(ConnectParams::new(), Blocking)?;
/// let pending = reql_wire::connect_with(ConnectParams::new(), NonBlocking)?;
/// # drop((conn, pending));
/// # Ok::<(), reql_wire::Error>(())
/// ```
pub fn connect_with<M: Mode>(params: ConnectParams, mode: M) -> Result<M::Handle> {
    let config = resolve_params(params, M::LABEL)?;
    mode.open(config)
}

fn resolve_params(params: ConnectParams, mode: &'static str) -> Result<ConnectionConfig> {
    resolve(params).map_err(|e| {
        tracing::warn!(mode, error = %e, "invalid connection parameters");
        counters::connect_failure(mode, "configuration");
        e.into()
    })
}

/// Produces deferred connections
pub trait AsyncConnector {
    /// Start a connection attempt without blocking.
    ///
    /// The returned value must honor the [`PendingConnection`] contract: lazy, and
    /// cancellable until it resolves.
    fn connect_async(&self) -> PendingConnection;
}

/// Factory bound to one resolved configuration.
///
/// Opens any number of independent connections; nothing is shared between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    config: ConnectionConfig,
}

impl Connector {
    /// Resolve parameters into a connector
    pub fn new(params: ConnectParams) -> std::result::Result<Self, ConfigError> {
        Ok(Self::from_config(resolve(params)?))
    }

    /// Connector for an already resolved configuration
    pub fn from_config(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// Configuration used for every connection
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open a blocking connection
    pub fn connect(&self) -> Result<BlockingConnection> {
        self.connect_with(Blocking)
    }

    /// Start a non-blocking connection
    pub fn connect_async(&self) -> PendingConnection {
        PendingConnection::new(self.config.clone())
    }

    /// Connect in the given mode
    pub fn connect_with<M: Mode>(&self, mode: M) -> Result<M::Handle> {
        mode.open(self.config.clone())
    }
}

impl AsyncConnector for Connector {
    fn connect_async(&self) -> PendingConnection {
        Connector::connect_async(self)
    }
}

impl AsyncConnector for ConnectionConfig {
    fn connect_async(&self) -> PendingConnection {
        PendingConnection::new(self.clone())
    }
}

impl From<ConnectionConfig> for Connector {
    fn from(config: ConnectionConfig) -> Self {
        Self::from_config(config)
    }
}

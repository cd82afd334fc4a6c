//! Blocking connection

use super::conn::AsyncConnection;
use super::state::ConnectionState;
use super::transport::Transport;
use crate::config::ConnectionConfig;
use crate::{Error, Result};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Connection usable from synchronous code.
///
/// Owns a private current-thread runtime; every operation runs to completion on the
/// calling thread. Operations that drive I/O fail with [`Error::Runtime`] when called
/// from inside an async runtime. Dropping the handle is allowed anywhere.
pub struct BlockingConnection {
    inner: AsyncConnection,
    // Some until dropped
    runtime: Option<Arc<Runtime>>,
}

impl std::fmt::Debug for BlockingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingConnection")
            .field("inner", &self.inner)
            .finish()
    }
}

impl BlockingConnection {
    /// Run the full handshake before returning.
    ///
    /// Socket connect, TLS and authentication together are bounded by the configured
    /// timeout.
    pub(crate) fn establish(config: ConnectionConfig) -> Result<Self> {
        ensure_outside_runtime(
            "blocking connect called from within an async runtime; use connect_async",
        )?;

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Runtime(format!("failed to build runtime: {}", e)))?;

        let host = config.host().to_string();
        let port = config.port();
        let timeout = config.timeout();

        // The timer must be created inside the runtime context
        let inner = runtime
            .block_on(async {
                tokio::time::timeout(timeout, AsyncConnection::establish(config)).await
            })
            .map_err(|_| {
                tracing::warn!(host = %host, port, "handshake timed out");
                Error::timeout(&host, port)
            })??;

        Ok(Self {
            inner,
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Configuration this connection was opened with
    pub fn config(&self) -> &ConnectionConfig {
        self.inner.config()
    }

    /// Current default database
    pub fn db(&self) -> &str {
        self.inner.db()
    }

    /// Change the default database for subsequent queries
    pub fn use_db(&mut self, db: impl Into<String>) -> Result<()> {
        self.inner.use_db(db)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Whether the connection has not been closed
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// Local port of the socket, `None` once closed
    pub fn client_port(&self) -> Option<u16> {
        self.inner.client_port()
    }

    /// Local IP address of the socket, `None` once closed
    pub fn client_address(&self) -> Option<IpAddr> {
        self.inner.client_address()
    }

    /// Server version reported during the handshake
    pub fn server_version(&self) -> Option<&str> {
        self.inner.server_version()
    }

    /// Underlying stream, for the query layer.
    ///
    /// Drive its futures with [`runtime`](Self::runtime).
    pub fn transport_mut(&mut self) -> Result<&mut Transport> {
        self.inner.transport_mut()
    }

    /// Runtime that owns the socket.
    ///
    /// A clone outliving the connection must not be dropped inside an async runtime.
    pub fn runtime(&self) -> Result<Arc<Runtime>> {
        self.runtime.clone().ok_or(Error::ConnectionClosed)
    }

    /// Close the connection. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::Runtime`] when called from inside an async runtime; the connection stays
    /// open.
    pub fn close(&mut self) -> Result<()> {
        if self.inner.state() == ConnectionState::Closed {
            return Ok(());
        }
        ensure_outside_runtime("blocking close called from within an async runtime")?;
        let runtime = self.runtime()?;
        runtime.block_on(self.inner.close())
    }
}

impl Drop for BlockingConnection {
    fn drop(&mut self) {
        // A plain runtime drop blocks, which panics inside another runtime
        if let Some(runtime) = self.runtime.take() {
            if let Ok(runtime) = Arc::try_unwrap(runtime) {
                runtime.shutdown_background();
            }
        }
    }
}

fn ensure_outside_runtime(reason: &str) -> Result<()> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(Error::Runtime(reason.to_string()));
    }
    Ok(())
}

//! Established async connection and the V1_0 handshake

use super::state::ConnectionState;
use super::tls::TlsConfig;
use super::transport::Transport;
use crate::auth::ScramClient;
use crate::config::ConnectionConfig;
use crate::protocol::constants::{AUTH_METHOD_SCRAM_SHA_256, PROTOCOL_VERSION};
use crate::protocol::{
    decode_message, encode_message, BackendMessage, ClientAuth, ClientHello, FrontendMessage,
};
use crate::{ConfigError, Error, Result};
use bytes::{Buf, BytesMut};
use std::io;
use std::net::{IpAddr, SocketAddr};
use tracing::Instrument;

/// RethinkDB connection driven by an async runtime.
///
/// Only produced by the factory once the handshake has completed, so a live value is
/// always [`ConnectionState::Established`] until [`close`](Self::close) is called.
pub struct AsyncConnection {
    transport: Option<Transport>,
    state: ConnectionState,
    read_buf: BytesMut,
    config: ConnectionConfig,
    db: String,
    server_version: Option<String>,
    local_addr: Option<SocketAddr>,
}

impl std::fmt::Debug for AsyncConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncConnection")
            .field("host", &self.config.host())
            .field("port", &self.config.port())
            .field("db", &self.db)
            .field("state", &self.state)
            .field("server_version", &self.server_version)
            .finish()
    }
}

impl AsyncConnection {
    /// Open a socket and run the handshake.
    ///
    /// The socket connect is bounded by the configured timeout; the rest of the
    /// handshake is not.
    pub(crate) async fn establish(config: ConnectionConfig) -> Result<Self> {
        let mut state = ConnectionState::Created;
        state.transition(ConnectionState::ResolvingConfig)?;

        let tls = match config.tls() {
            Some(params) => match TlsConfig::from_params(params) {
                Ok(tls) => Some(tls),
                Err(e) => {
                    state.transition(ConnectionState::Failed)?;
                    tracing::warn!(error = %e, "TLS setup failed");
                    return Err(e);
                }
            },
            None => None,
        };

        state.transition(ConnectionState::Handshaking)?;

        let span = tracing::info_span!(
            "handshake",
            host = %config.host(),
            port = config.port(),
            user = %config.user(),
            tls = config.is_tls()
        );

        async move {
            let transport =
                Transport::connect(config.host(), config.port(), tls.as_ref(), config.timeout())
                    .await
                    .map_err(|e| {
                        tracing::warn!(error = %e, "socket connect failed");
                        e
                    })?;
            tracing::debug!("socket open");

            let local_addr = transport.local_addr().ok();
            let db = config.db().to_string();
            let mut conn = AsyncConnection {
                transport: Some(transport),
                state,
                read_buf: BytesMut::with_capacity(1024),
                config,
                db,
                server_version: None,
                local_addr,
            };

            match conn.handshake().await {
                Ok(()) => {
                    conn.state.transition(ConnectionState::Established)?;
                    tracing::info!(
                        server_version = conn.server_version.as_deref().unwrap_or("unknown"),
                        "connection established"
                    );
                    Ok(conn)
                }
                Err(e) => {
                    conn.state.transition(ConnectionState::Failed)?;
                    tracing::warn!(error = %e, "handshake failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn handshake(&mut self) -> Result<()> {
        let scram = ScramClient::new(self.config.user(), self.config.password());

        let hello = FrontendMessage::Hello(ClientHello {
            protocol_version: PROTOCOL_VERSION,
            authentication_method: AUTH_METHOD_SCRAM_SHA_256.to_string(),
            authentication: scram.client_first(),
        });
        self.send_message(&hello).await?;

        match self.receive_message().await? {
            BackendMessage::ServerHello {
                min_protocol_version,
                max_protocol_version,
                server_version,
            } => {
                if !(min_protocol_version..=max_protocol_version).contains(&PROTOCOL_VERSION) {
                    return Err(Error::Protocol(format!(
                        "unsupported protocol version {}, server supports {} through {}",
                        PROTOCOL_VERSION, min_protocol_version, max_protocol_version
                    )));
                }
                tracing::debug!(?server_version, "server hello accepted");
                self.server_version = server_version;
            }
            other => return Err(unexpected(other, "server hello")),
        }

        let server_first = match self.receive_message().await? {
            BackendMessage::Authentication(data) => data,
            other => return Err(unexpected(other, "SCRAM server-first message")),
        };
        tracing::debug!("received SCRAM server-first message");

        let (client_final, scram_state) = scram
            .client_final(&server_first)
            .map_err(|e| Error::Authentication(format!("SCRAM error: {}", e)))?;

        let auth = FrontendMessage::Auth(ClientAuth {
            authentication: client_final,
        });
        self.send_message(&auth).await?;

        let server_final = match self.receive_message().await? {
            BackendMessage::Authentication(data) => data,
            other => return Err(unexpected(other, "SCRAM server-final message")),
        };

        scram
            .verify_server_final(&server_final, &scram_state)
            .map_err(|e| Error::Authentication(format!("SCRAM verification failed: {}", e)))?;

        tracing::debug!("SCRAM-SHA-256 authentication successful");
        Ok(())
    }

    /// Send a frontend message
    async fn send_message(&mut self, msg: &FrontendMessage) -> Result<()> {
        let buf = encode_message(msg)?;
        let transport = self.transport_mut()?;
        transport.write_all(&buf).await?;
        transport.flush().await?;
        Ok(())
    }

    /// Receive one handshake reply
    async fn receive_message(&mut self) -> Result<BackendMessage> {
        loop {
            match decode_message(&self.read_buf) {
                Ok((msg, consumed)) => {
                    self.read_buf.advance(consumed);
                    return Ok(msg);
                }
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {}
                Err(e) => return Err(Error::Protocol(e.to_string())),
            }

            let transport = self.transport.as_mut().ok_or(Error::ConnectionClosed)?;
            let n = transport.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// Configuration this connection was opened with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Current default database
    pub fn db(&self) -> &str {
        &self.db
    }

    /// Change the default database for subsequent queries
    pub fn use_db(&mut self, db: impl Into<String>) -> Result<()> {
        let db = db.into();
        if db.is_empty() {
            return Err(ConfigError::invalid("db", "must not be empty").into());
        }
        tracing::debug!(db = %db, "default database changed");
        self.db = db;
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connection has not been closed
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Established
    }

    /// Local port of the socket, `None` once closed
    pub fn client_port(&self) -> Option<u16> {
        self.open_addr().map(|addr| addr.port())
    }

    /// Local IP address of the socket, `None` once closed
    pub fn client_address(&self) -> Option<IpAddr> {
        self.open_addr().map(|addr| addr.ip())
    }

    fn open_addr(&self) -> Option<SocketAddr> {
        if self.is_open() {
            self.local_addr
        } else {
            None
        }
    }

    /// Server version reported during the handshake
    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    /// Underlying stream, for the query layer
    pub fn transport_mut(&mut self) -> Result<&mut Transport> {
        self.transport.as_mut().ok_or(Error::ConnectionClosed)
    }

    /// Close the connection. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.state.transition(ConnectionState::Closed)?;

        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };
        tracing::info!(host = %self.config.host(), port = self.config.port(), "connection closed");
        transport.shutdown().await
    }
}

/// Map a reply that does not fit the current handshake step onto an error
fn unexpected(msg: BackendMessage, step: &str) -> Error {
    let is_auth_error = msg.is_auth_error();
    match msg {
        BackendMessage::ErrorResponse { message, .. } if is_auth_error => {
            Error::Authentication(message)
        }
        BackendMessage::ErrorResponse {
            message,
            code: Some(code),
        } => Error::Connection(format!("server error {}: {}", code, message)),
        BackendMessage::ErrorResponse {
            message,
            code: None,
        } => Error::Connection(format!("server error: {}", message)),
        other => Error::Protocol(format!("expected {}, got {:?}", step, other)),
    }
}

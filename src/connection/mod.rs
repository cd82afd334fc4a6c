//! Connection management
//!
//! This module handles:
//! * Transport abstraction (TCP with optional TLS)
//! * The V1_0 handshake and SCRAM authentication
//! * Blocking and async connection handles
//! * State machine enforcement

mod blocking;
mod conn;
mod state;
mod tls;
mod transport;

pub use blocking::BlockingConnection;
pub use conn::AsyncConnection;
pub use state::ConnectionState;
pub use tls::{parse_server_name, TlsConfig};
pub use transport::Transport;

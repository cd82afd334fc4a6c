//! Handshake message types

use serde::{Deserialize, Serialize};

/// First client message, sent right after the magic number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientHello {
    /// JSON protocol version
    pub protocol_version: u32,
    /// Always "SCRAM-SHA-256"
    pub authentication_method: String,
    /// SCRAM client-first-message
    pub authentication: String,
}

/// Client message carrying the SCRAM client-final-message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAuth {
    /// SCRAM client-final-message
    pub authentication: String,
}

/// Frontend message (client → server)
#[derive(Debug, Clone)]
pub enum FrontendMessage {
    /// Magic number followed by the hello JSON
    Hello(ClientHello),
    /// Authentication proof
    Auth(ClientAuth),
}

/// Raw server reply; the fields present depend on the handshake step
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerReply {
    /// Whether the step succeeded
    pub success: bool,
    /// Error message when `success` is false
    #[serde(default)]
    pub error: Option<String>,
    /// Error code when `success` is false
    #[serde(default)]
    pub error_code: Option<i64>,
    /// Lowest supported protocol version (first reply)
    #[serde(default)]
    pub min_protocol_version: Option<u32>,
    /// Highest supported protocol version (first reply)
    #[serde(default)]
    pub max_protocol_version: Option<u32>,
    /// Server version string (first reply)
    #[serde(default)]
    pub server_version: Option<String>,
    /// SCRAM payload (second and third reply)
    #[serde(default)]
    pub authentication: Option<String>,
}

/// Backend message (server → client), classified by content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMessage {
    /// Protocol range and server version
    ServerHello {
        /// Lowest supported protocol version
        min_protocol_version: u32,
        /// Highest supported protocol version
        max_protocol_version: u32,
        /// Server version string
        server_version: Option<String>,
    },
    /// SCRAM payload (server-first or server-final message)
    Authentication(String),
    /// Server reported a failure
    ErrorResponse {
        /// Error message
        message: String,
        /// Error code, if any
        code: Option<i64>,
    },
}

impl TryFrom<ServerReply> for BackendMessage {
    type Error = String;

    fn try_from(reply: ServerReply) -> Result<Self, Self::Error> {
        if !reply.success {
            return Ok(BackendMessage::ErrorResponse {
                message: reply
                    .error
                    .unwrap_or_else(|| "unspecified server error".to_string()),
                code: reply.error_code,
            });
        }

        if let Some(auth) = reply.authentication {
            return Ok(BackendMessage::Authentication(auth));
        }

        match (reply.min_protocol_version, reply.max_protocol_version) {
            (Some(min_protocol_version), Some(max_protocol_version)) => {
                Ok(BackendMessage::ServerHello {
                    min_protocol_version,
                    max_protocol_version,
                    server_version: reply.server_version,
                })
            }
            _ => Err("server hello is missing its protocol version range".to_string()),
        }
    }
}

impl BackendMessage {
    /// Whether this is an authentication failure reported by the server
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            BackendMessage::ErrorResponse { code: Some(code), .. }
                if super::constants::AUTH_ERROR_CODES.contains(code)
        )
    }
}

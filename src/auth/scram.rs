//! SCRAM-SHA-256 authentication (RFC 5802, RFC 7677)
//!
//! RethinkDB runs the exchange inside its JSON handshake. The client never uses
//! channel binding, so the GS2 header is always `n,,`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Client nonce length in raw bytes, before base64
const NONCE_LEN: usize = 18;

/// `base64("n,,")`
const GS2_CBIND: &str = "biws";

/// SCRAM authentication error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScramError {
    /// Server signature did not match
    #[error("invalid server proof: {0}")]
    InvalidServerProof(String),
    /// Malformed server message
    #[error("invalid server message: {0}")]
    InvalidServerMessage(String),
    /// Base64 decoding error
    #[error("base64 error: {0}")]
    Base64Error(String),
}

/// Values kept between the client-final and server-final steps
#[derive(Clone)]
pub struct ScramState {
    auth_message: Vec<u8>,
    server_key: Vec<u8>,
}

impl std::fmt::Debug for ScramState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScramState")
            .field("auth_message", &String::from_utf8_lossy(&self.auth_message))
            .field("server_key", &"<redacted>")
            .finish()
    }
}

/// SCRAM-SHA-256 client
pub struct ScramClient {
    username: String,
    password: String,
    nonce: String,
}

impl ScramClient {
    /// Create a client with a fresh random nonce
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        Self::with_nonce(username, password, BASE64.encode(nonce_bytes))
    }

    pub(crate) fn with_nonce(
        username: impl Into<String>,
        password: impl Into<String>,
        nonce: String,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            nonce,
        }
    }

    /// `n=<user>,r=<nonce>`
    fn client_first_bare(&self) -> String {
        format!("n={},r={}", escape_username(&self.username), self.nonce)
    }

    /// Client-first-message, GS2 header included
    pub fn client_first(&self) -> String {
        format!("n,,{}", self.client_first_bare())
    }

    /// Process the server-first-message and build the client-final-message
    pub fn client_final(&self, server_first: &str) -> Result<(String, ScramState), ScramError> {
        let (server_nonce, salt, iterations) = parse_server_first(server_first)?;

        if !server_nonce.starts_with(&self.nonce) {
            return Err(ScramError::InvalidServerMessage(
                "server nonce doesn't contain client nonce".to_string(),
            ));
        }

        let salt_bytes = BASE64
            .decode(salt)
            .map_err(|_| ScramError::Base64Error("invalid salt encoding".to_string()))?;
        let iterations = iterations
            .parse::<u32>()
            .map_err(|_| ScramError::InvalidServerMessage("invalid iteration count".to_string()))?;
        if iterations == 0 {
            return Err(ScramError::InvalidServerMessage(
                "iteration count must be positive".to_string(),
            ));
        }

        let client_final_without_proof = format!("c={},r={}", GS2_CBIND, server_nonce);
        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare(),
            server_first,
            client_final_without_proof
        );

        let salted_password = salt_password(&self.password, &salt_bytes, iterations);
        let proof = client_proof(&salted_password, auth_message.as_bytes());
        let server_key = hmac(&salted_password, b"Server Key");

        let client_final = format!("{},p={}", client_final_without_proof, BASE64.encode(proof));

        Ok((
            client_final,
            ScramState {
                auth_message: auth_message.into_bytes(),
                server_key,
            },
        ))
    }

    /// Verify the server-final-message `v=<signature>`
    pub fn verify_server_final(
        &self,
        server_final: &str,
        state: &ScramState,
    ) -> Result<(), ScramError> {
        let encoded = server_final
            .split(',')
            .find_map(|part| part.strip_prefix("v="))
            .ok_or_else(|| ScramError::InvalidServerMessage("missing 'v=' field".to_string()))?;

        let server_signature = BASE64.decode(encoded).map_err(|_| {
            ScramError::Base64Error("invalid server signature encoding".to_string())
        })?;

        let expected = hmac(&state.server_key, &state.auth_message);

        if constant_time_compare(&server_signature, &expected) {
            Ok(())
        } else {
            Err(ScramError::InvalidServerProof(
                "server signature verification failed".to_string(),
            ))
        }
    }
}

/// SASLprep-lite username escaping: `=` → `=3D`, `,` → `=2C`
fn escape_username(username: &str) -> String {
    username.replace('=', "=3D").replace(',', "=2C")
}

/// Parse `r=<nonce>,s=<salt>,i=<iterations>` in any field order
fn parse_server_first(msg: &str) -> Result<(&str, &str, &str), ScramError> {
    let mut nonce = "";
    let mut salt = "";
    let mut iterations = "";

    for part in msg.split(',') {
        if let Some(value) = part.strip_prefix("r=") {
            nonce = value;
        } else if let Some(value) = part.strip_prefix("s=") {
            salt = value;
        } else if let Some(value) = part.strip_prefix("i=") {
            iterations = value;
        }
    }

    if nonce.is_empty() || salt.is_empty() || iterations.is_empty() {
        return Err(ScramError::InvalidServerMessage(
            "missing required fields in server first message".to_string(),
        ));
    }

    Ok((nonce, salt, iterations))
}

/// SaltedPassword := PBKDF2(password, salt, i, HMAC-SHA256)
fn salt_password(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut salted = [0u8; 32];
    // Only fails for an invalid output length, which is fixed here
    let _ = pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations, &mut salted);
    salted
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts any key length"),
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// ClientProof := ClientKey XOR HMAC(SHA256(ClientKey), AuthMessage)
fn client_proof(salted_password: &[u8], auth_message: &[u8]) -> Vec<u8> {
    let client_key = hmac(salted_password, b"Client Key");
    let stored_key = Sha256::digest(&client_key);
    let signature = hmac(&stored_key, auth_message);

    client_key
        .iter()
        .zip(signature.iter())
        .map(|(k, s)| k ^ s)
        .collect()
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

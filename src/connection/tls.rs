//! TLS configuration for connections to RethinkDB.
//!
//! Built from [`TlsParams`] when a connection is opened, so a missing or malformed CA
//! file surfaces as [`Error::Tls`] during the handshake, never during resolution.

use crate::config::TlsParams;
use crate::{Error, Result};
use rustls::ClientConfig;
use rustls::RootCertStore;
use rustls_pemfile::Item;
use rustls_pki_types::ServerName;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compiled TLS settings for one connection attempt
#[derive(Clone)]
pub struct TlsConfig {
    /// CA file the root store was loaded from (None = system roots)
    ca_certs: Option<PathBuf>,
    /// Name the certificate is verified against, if overridden
    server_name: Option<String>,
    client_config: Arc<ClientConfig>,
}

impl TlsConfig {
    /// Build a client configuration from TLS parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if:
    /// - the CA file cannot be read or holds no certificate
    /// - no trust anchors could be loaded at all
    pub fn from_params(params: &TlsParams) -> Result<Self> {
        let root_store = match &params.ca_certs {
            Some(path) => load_custom_ca(path)?,
            None => load_system_roots()?,
        };

        let client_config = Arc::new(
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );

        Ok(TlsConfig {
            ca_certs: params.ca_certs.clone(),
            server_name: params.server_name.clone(),
            client_config,
        })
    }

    /// Get the rustls ClientConfig
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// Name to present via SNI and verify the certificate against
    pub fn server_name_for<'a>(&'a self, host: &'a str) -> &'a str {
        self.server_name.as_deref().unwrap_or(host)
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("ca_certs", &self.ca_certs)
            .field("server_name", &self.server_name)
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

/// Native trust store, falling back to the bundled Mozilla roots
fn load_system_roots() -> Result<RootCertStore> {
    let result = rustls_native_certs::load_native_certs();

    let mut store = RootCertStore::empty();
    let (added, _ignored) = store.add_parsable_certificates(result.certs);

    if !result.errors.is_empty() {
        tracing::debug!(
            errors = result.errors.len(),
            "some native root certificates could not be loaded"
        );
    }

    if added == 0 {
        tracing::debug!("no native root certificates, using bundled webpki roots");
        store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    if store.is_empty() {
        return Err(Error::Tls("no root certificates available".to_string()));
    }

    Ok(store)
}

/// Load CA certificates from a PEM file
fn load_custom_ca(ca_path: &Path) -> Result<RootCertStore> {
    let ca_cert_data = fs::read(ca_path).map_err(|e| {
        Error::Tls(format!(
            "failed to read CA certificate file '{}': {}",
            ca_path.display(),
            e
        ))
    })?;

    let mut reader = std::io::Cursor::new(&ca_cert_data);
    let mut root_store = RootCertStore::empty();
    let mut found_certs = 0;

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(Item::X509Certificate(cert))) => {
                root_store
                    .add(cert)
                    .map_err(|e| Error::Tls(format!("invalid CA certificate: {}", e)))?;
                found_certs += 1;
            }
            // Keys and other PEM sections are not trust anchors
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(_) => {
                return Err(Error::Tls(format!(
                    "failed to parse CA certificate from '{}'",
                    ca_path.display()
                )));
            }
        }
    }

    if found_certs == 0 {
        return Err(Error::Tls(format!(
            "no valid certificates found in '{}'",
            ca_path.display()
        )));
    }

    Ok(root_store)
}

/// Parse a host name or IP address for TLS SNI and certificate verification.
///
/// # Errors
///
/// Returns [`Error::Tls`] if the name is neither a valid DNS name nor an IP address.
pub fn parse_server_name(hostname: &str) -> Result<ServerName<'static>> {
    let hostname = hostname.trim_end_matches('.');

    if hostname.is_empty() || hostname.len() > 253 {
        return Err(Error::Tls(format!(
            "invalid hostname for TLS: '{}'",
            hostname
        )));
    }

    ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Tls(format!("invalid hostname for TLS: '{}'", hostname)))
}

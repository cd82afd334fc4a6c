//! Integration tests for TLS connections
//!
//! The ignored tests need a RethinkDB server with TLS enabled:
//!
//! ```bash
//! rethinkdb --driver-tls-key /tmp/server.key --driver-tls-cert /tmp/server.crt
//!
//! export REQL_TLS_TEST_URL="rethinkdb://admin@localhost:28015/test"
//! export REQL_TLS_TEST_CA="/tmp/server.crt"
//!
//! cargo test --test tls_integration -- --ignored --nocapture
//! ```

mod common;

use common::{Behavior, MockServer};
use reql_wire::{connect, connect_async, ConnectParams, Error, TlsParams};
use std::env;
use std::time::Duration;

fn tls_test_params() -> Option<ConnectParams> {
    let url = env::var("REQL_TLS_TEST_URL").ok()?;
    let mut tls = TlsParams::new();
    if let Ok(ca) = env::var("REQL_TLS_TEST_CA") {
        tls = tls.ca_certs(ca);
    }
    Some(ConnectParams::new().url(url).ssl(tls))
}

#[test]
fn test_tls_against_plaintext_server_fails() {
    let server = MockServer::start(Behavior::accept("admin", ""));

    let err = connect(
        ConnectParams::new()
            .host("127.0.0.1")
            .port(u32::from(server.port()))
            .ssl(TlsParams::new()),
    )
    .unwrap_err();

    assert!(matches!(err, Error::Tls(_)), "{err}");
    assert!(server.wait_for_open(0, Duration::from_secs(5)));
}

#[test]
fn test_missing_ca_file_fails_at_connect_time() {
    // Resolution succeeds; the file is only read when connecting
    let params = ConnectParams::new()
        .host("127.0.0.1")
        .port(1)
        .ssl(TlsParams::new().ca_certs("/nonexistent/ca.pem"));
    assert!(params.clone().resolve().is_ok());

    let err = connect(params).unwrap_err();
    assert!(matches!(err, Error::Tls(_)), "{err}");
}

#[test]
#[ignore] // Requires RethinkDB with TLS enabled
fn test_tls_blocking_connection() {
    let Some(params) = tls_test_params() else {
        eprintln!("Skipping test: REQL_TLS_TEST_URL not set");
        return;
    };

    let mut conn = connect(params).expect("TLS connect");
    assert!(conn.config().is_tls());
    assert!(conn.transport_mut().unwrap().is_tls());
    println!("server version: {:?}", conn.server_version());
    conn.close().unwrap();
}

#[tokio::test]
#[ignore] // Requires RethinkDB with TLS enabled
async fn test_tls_async_connections() {
    let Some(params) = tls_test_params() else {
        eprintln!("Skipping test: REQL_TLS_TEST_URL not set");
        return;
    };

    let pending: Vec<_> = (0..3)
        .map(|_| connect_async(params.clone()).unwrap())
        .collect();
    let conns = futures::future::try_join_all(pending).await.expect("TLS connect");

    for mut conn in conns {
        assert!(conn.transport_mut().unwrap().is_tls());
        conn.close().await.unwrap();
    }
}

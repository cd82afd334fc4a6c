//! Counter metrics

use metrics::counter;

/// A connection attempt started
pub fn connect_attempt(mode: &'static str) {
    counter!("reql_wire_connect_attempts_total", "mode" => mode).increment(1);
}

/// A connection attempt failed
pub fn connect_failure(mode: &'static str, category: &'static str) {
    counter!(
        "reql_wire_connect_failures_total",
        "mode" => mode,
        "category" => category
    )
    .increment(1);
}

/// A connection completed its handshake
pub fn connection_established(mode: &'static str) {
    counter!("reql_wire_connections_established_total", "mode" => mode).increment(1);
}

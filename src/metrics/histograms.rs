//! Histogram metrics

use metrics::histogram;

/// Time from attempt start to an established connection
pub fn handshake_duration(mode: &'static str, duration_ms: u64) {
    histogram!("reql_wire_handshake_duration_ms", "mode" => mode).record(duration_ms as f64);
}

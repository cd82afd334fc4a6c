//! Connect to a RethinkDB server in both modes
//!
//! Run with:
//! ```bash
//! RUST_LOG=reql_wire=debug cargo run --example connect -- rethinkdb://admin@localhost:28015/test
//! ```

use reql_wire::{ConnectParams, Connector};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "rethinkdb://localhost:28015/test".to_string());

    let connector = Connector::new(ConnectParams::new().url(url))?;
    println!("Connecting to {}", connector.config());

    // Blocking: the handshake is complete when connect returns
    let mut conn = connector.connect()?;
    println!(
        "blocking: server {} from {:?}:{:?}",
        conn.server_version().unwrap_or("unknown"),
        conn.client_address(),
        conn.client_port()
    );
    conn.close()?;

    // Non-blocking: a future driven by our own runtime
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let pending = connector.connect_async();
        let mut conn = pending.await?;
        println!(
            "non-blocking: server {} on db {}",
            conn.server_version().unwrap_or("unknown"),
            conn.db()
        );
        conn.close().await
    })?;

    Ok(())
}

//! # Relay Node
//!
//! Hosts the parcel relay for one cluster node.
//!
//! ## Usage
//!
//! ```bash
//! PARCEL_CONFIG=relay.toml PARCEL_PUBLIC_HOST=10.0.0.7 RUST_LOG=debug relay-node
//! ```

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = relay_node::load_config()?;

    let handle = relay_node::build_service(config)
        .start()
        .await
        .context("Failed to start parcel relay")?;

    info!(
        addr = %handle.local_addr(),
        public_host = %handle.endpoint().host,
        "Relay node is running. Press Ctrl+C to stop."
    );
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    handle.shutdown().await;

    Ok(())
}

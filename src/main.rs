/*!
 * Memory Server - Main Entry Point
 *
 * Configuration comes from the environment; see `ServerConfig::from_env`.
 */

use anyhow::Context;
use remote_memory::{init_tracing, Server, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured tracing
    init_tracing();

    info!("Memory server starting...");

    let config = ServerConfig::from_env().context("Failed to read configuration")?;
    info!(
        listen_addr = %config.listen_addr,
        arena_bytes = config.arena_size,
        gc_interval_secs = config.gc_interval.as_secs(),
        snapshot_dir = ?config.snapshot_dir,
        "Configuration loaded"
    );

    let server = Server::bind(config).await.context("Failed to start server")?;
    info!(addr = %server.local_addr()?, "Ready for clients");

    server.run().await?;

    info!("Memory server stopped");
    Ok(())
}

use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network;
use server::session::SessionManager;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::parse();
    let world_config = config.world_config()?;

    info!(
        "Worlds are {}x{} with {} objects, viewport culling {}",
        world_config.width(),
        world_config.height(),
        world_config.generator.object_count,
        if world_config.full_snapshot { "off" } else { "on" }
    );

    let manager = Arc::new(SessionManager::new(world_config));
    let listener = TcpListener::bind(config.address()).await?;

    network::serve(listener, Arc::clone(&manager), config.static_dir, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    })
    .await?;

    info!("Server stopped with {} worlds loaded", manager.world_count().await);
    Ok(())
}

//! ledlink Relay Server
//!
//! Bridges one ESP32 and any number of browser observers over WebSocket.
//!
//! # Usage
//!
//! ```bash
//! # Default (0.0.0.0, port from $PORT or 3000)
//! ledlink-relay
//!
//! # Explicit port and a config file
//! ledlink-relay --port 8080 --config relay.toml
//! ```

mod config;

use anyhow::Result;
use clap::Parser;
use ledlink_router::{Router, RouterConfig};
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, FileConfig, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&cli, file);

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr = settings.listen_addr();
    tracing::info!("Starting {}", settings.name);
    tracing::info!("WebSocket: ws://{}", addr);

    let router = Router::new(RouterConfig {
        name: settings.name.clone(),
        max_connections: settings.max_connections,
        ..Default::default()
    });

    tokio::select! {
        result = router.serve_websocket(&addr) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            router.stop();
        }
    }

    Ok(())
}

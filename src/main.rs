//! machsim - Automaton Simulation Service
//!
//! A TCP-based simulation service for finite-state machines: submit a
//! machine and a tape, then run it to completion or drive it one step at
//! a time over a persistent connection.

use machsim_core::SimulationRegistry;
use machsim_server::{Config, Server, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if MACHSIM_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("MACHSIM_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // If a config file was explicitly specified, fail on error
            if std::env::var("MACHSIM_CONFIG").is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::info!("Using default configuration");
            Config::default()
        }
    };

    tracing::info!("Starting machsim server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Idle timeout: {}s", config.network.idle_timeout_secs);
    tracing::info!("  Max connections: {}", config.network.max_connections);
    tracing::info!("  Max message size: {}B", config.limits.max_message_bytes);

    // One registry for the lifetime of the process; every connection
    // shares it.
    let registry = Arc::new(SimulationRegistry::new());

    let server = Arc::new(Server::new(
        ServerConfig::from_config(&config),
        registry.clone(),
    ));

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    if !registry.is_empty() {
        tracing::info!("Dropping {} live simulation session(s)", registry.len());
    }

    tracing::info!("Server stopped");
    Ok(())
}

//! Syncroom Server - standalone server for synchronized playback rooms.
//!
//! Serves the room WebSocket endpoint and read-only HTTP views, and runs
//! until interrupted.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use syncroom_core::{bootstrap_services, start_server};
use tokio::signal;

use crate::config::ServerConfig;

/// Syncroom Server - shared playback rooms over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "syncroom-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "SYNCROOM_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file; 0 scans 5000-5010).
    #[arg(short = 'p', long, env = "SYNCROOM_BIND_PORT")]
    port: Option<u16>,

    /// Drop empty rooms untouched for this many seconds (0 disables).
    #[arg(long, value_name = "SECS", env = "SYNCROOM_IDLE_ROOM_TTL")]
    idle_room_ttl: Option<u64>,

    /// Reply with an error to actions for rooms nobody has joined.
    #[arg(long)]
    report_unknown_room: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Syncroom Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(ttl) = args.idle_room_ttl {
        config.idle_room_ttl_secs = ttl;
    }
    if args.report_unknown_room {
        config.report_unknown_room = true;
    }

    log::info!(
        "Configuration: bind_port={}, idle_room_ttl={}s, report_unknown_room={}",
        config.bind_port,
        config.idle_room_ttl_secs,
        config.report_unknown_room
    );

    let core_config = config.to_core_config();
    let services = bootstrap_services(&core_config).context("Invalid configuration")?;

    log::info!("Services bootstrapped successfully");

    services.start_background_tasks();

    let app_state = services.app_state();
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state).await {
            log::error!("[Server] {}", e);
        }
    });

    // Wait for shutdown signal, or for the server to fail on its own
    tokio::select! {
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, cleaning up...");
        }
        _ = &mut server_handle => {
            log::error!("Server stopped unexpectedly");
        }
    }

    // Graceful shutdown
    services.shutdown();
    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! airplay-ls (Ledger Service) - Main entry point
//!
//! Records channel plays and serves play history and weekly charts.

use std::net::SocketAddr;
use std::path::PathBuf;

use airplay_common::config::{
    load_config, resolve_config_path, resolve_database_path, ConfigSource,
};
use airplay_ls::{build_router, AppState, Ledger};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for airplay-ls
#[derive(Parser, Debug)]
#[command(name = "airplay-ls")]
#[command(about = "Play ledger and weekly chart service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config)
    #[arg(short = 'P', long, env = "AIRPLAY_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Drop and recreate all tables before serving
    #[arg(long)]
    drop_database: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let loaded = load_config(config_path.as_deref()).context("Failed to load configuration")?;
    let config = loaded.config;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting airplay ledger service (airplay-ls) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &loaded.source {
        ConfigSource::File(path) => info!("Config file: {}", path.display()),
        ConfigSource::MissingFile(path) => {
            warn!("Config file {} not found, using defaults", path.display())
        }
        ConfigSource::Defaults => info!("No config file, using defaults"),
    }

    let db_path = resolve_database_path(args.database.as_deref(), &config);
    info!("Database: {}", db_path.display());

    let ledger = Ledger::open(&db_path, &config.database_pool)
        .await
        .context("Failed to open ledger database")?;

    if args.drop_database {
        ledger.recreate_schema().await?;
    }

    let state = AppState::new(ledger, config.chart.default_limit);
    let app = build_router(state);

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

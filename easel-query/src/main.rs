//! easel-query - Episode catalog filter service
//!
//! Serves `GET /episodes`, `/materials`, `/tags` and `/health` over a
//! read-only connection to the catalog database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use easel_common::config::EaselConfig;
use easel_query::{build_router, AppState};
use tracing::{error, info};

/// Command-line arguments for easel-query
#[derive(Parser, Debug)]
#[command(name = "easel-query")]
#[command(about = "Filter the episode catalog over HTTP")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "EASEL_DATABASE")]
    database: Option<PathBuf>,

    /// Listen host
    #[arg(long, env = "EASEL_HOST")]
    host: Option<String>,

    /// Listen port
    #[arg(short, long, env = "EASEL_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = EaselConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Starting easel-query v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Database path: {}", config.database_path.display());

    let pool = match easel_query::db::connect_readonly(&config.database_path).await {
        Ok(pool) => {
            info!("Connected to database (read-only)");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e);
        }
    };

    let app = build_router(AppState::new(pool));

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("easel-query listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}

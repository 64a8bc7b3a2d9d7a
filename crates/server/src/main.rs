//! Freight server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use freight_core::config::AppConfig;
use freight_server::{create_router, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Freight - a chunked file-transfer service
#[derive(Parser, Debug)]
#[command(name = "freightd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "FREIGHT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Freight v{}", env!("CARGO_PKG_VERSION"));

    // Config file is optional, env vars can provide/override everything.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("FREIGHT_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;

    // Initialize storage backend and verify connectivity before accepting
    // requests; a misconfigured data directory should fail startup, not the
    // first upload.
    let storage = freight_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!("Storage backend initialized");

    let metadata = freight_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    let state = AppState::new(config.clone(), storage, metadata);

    // Startup sweep clears anything that expired while the server was down,
    // then the interval task takes over.
    let sweep_stats = freight_server::sweeper::run_sweep(&state).await;
    tracing::info!(
        expired_purged = sweep_stats.expired_purged,
        orphans_removed = sweep_stats.orphans_removed,
        "Startup retention sweep complete"
    );

    let sweep_state = state.clone();
    let sweep_interval = config.retention.sweep_interval();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            freight_server::sweeper::run_sweep(&sweep_state).await;
        }
    });
    tracing::info!(
        interval_secs = sweep_interval.as_secs(),
        "Retention sweeper spawned"
    );

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nabgate_core::{
    load_config, validate_config, Config, IndexerSet, JackettIndexer, SecretSource,
};
use nabgate_server::api::create_router;
use nabgate_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("NABGATE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!(version = VERSION, "Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    let registry = build_registry(&config).context("Failed to set up indexers")?;
    if registry.is_empty() {
        warn!("No indexers enabled; every search will fail");
    } else {
        info!(indexers = registry.len(), "Indexers registered");
    }

    let state = Arc::new(AppState::new(config.clone(), Arc::new(registry)));

    // Derive the shared secret now so a random key is known before clients arrive
    let secret = state.secrets().shared_secret();
    match secret.source() {
        SecretSource::Random => {
            info!(api_key = %secret.display(), "Generated random API key for this run")
        }
        source => info!(source = source.as_str(), "Shared secret ready"),
    }
    info!(public_url = %config.server.public_url(), "Download links will use this base URL");

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// One `JackettIndexer` per enabled indexer entry, plus configured aliases.
fn build_registry(config: &Config) -> Result<IndexerSet> {
    let mut registry = IndexerSet::new().with_aliases(&config.aliases);

    let Some(jackett) = &config.jackett else {
        info!("No Jackett upstream configured");
        return Ok(registry);
    };

    for indexer_config in &jackett.indexers {
        if !indexer_config.enabled {
            info!(indexer = %indexer_config.name, "Indexer disabled in config");
            continue;
        }
        let indexer = JackettIndexer::new(jackett, indexer_config).with_context(|| {
            format!("Failed to create Jackett indexer '{}'", indexer_config.name)
        })?;
        info!(
            indexer = %indexer_config.name,
            jackett_id = %indexer_config.jackett_id(),
            "Initializing Jackett indexer"
        );
        registry = registry.with_indexer(Arc::new(indexer));
    }

    Ok(registry)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

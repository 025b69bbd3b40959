//! handreceipt-import - hand receipt reconciliation service
//!
//! Accepts DA Form 2062 extraction output over HTTP, reconciles it against the
//! property inventory and returns a per-item report.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use handreceipt_common::config::{self, RootFolderInitializer, RootFolderResolver, TomlConfig};
use handreceipt_common::events::EventBus;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use handreceipt_import::db::{self, SqliteLedger, SqlitePropertyStore};
use handreceipt_import::models::UnitInfo;
use handreceipt_import::services::{BatchImportOrchestrator, OrchestratorSettings};
use handreceipt_import::AppState;

#[derive(Parser, Debug)]
#[command(name = "handreceipt-import")]
#[command(about = "Hand receipt import and reconciliation service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "HANDRECEIPT_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (default: ~/.config/handreceipt/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(config::default_config_path);
    let toml_config = config::load_or_default(config_path.as_deref());

    init_tracing(&toml_config)?;

    let port = args.port.unwrap_or(toml_config.port);
    info!("Starting handreceipt-import");
    info!(
        "Version: {} (build {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let event_bus = EventBus::new(100);

    let store = Arc::new(SqlitePropertyStore::new(
        db_pool.clone(),
        toml_config.import.max_lock_wait_ms,
    ));
    let ledger = Arc::new(SqliteLedger::new(db_pool.clone()));
    let default_unit = toml_config.unit.as_ref().map(|u| UnitInfo {
        unit_name: u.unit_name.clone(),
        dodaac: u.dodaac.clone(),
    });

    let mut orchestrator = BatchImportOrchestrator::new(store.clone(), store, ledger)
        .with_settings(OrchestratorSettings::from(&toml_config.import))
        .with_event_bus(event_bus.clone())
        .with_default_unit(default_unit);
    if let Some(enricher) = handreceipt_import::config::build_nsn_enricher(&toml_config)
        .context("Failed to build NSN catalog client")?
    {
        orchestrator = orchestrator.with_enricher(enricher);
    }
    info!(
        workers = orchestrator.settings().max_workers,
        nsn_enrichment = orchestrator.has_enricher(),
        "Import pipeline ready"
    );

    let state = AppState::new(db_pool, event_bus, orchestrator);
    let shutdown = state.shutdown.clone();
    let app = handreceipt_import::build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// RUST_LOG wins; otherwise the configured level
fn init_tracing(toml_config: &TomlConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "handreceipt_import={level},handreceipt_common={level},tower_http=info",
            level = toml_config.logging.level
        )
        .into()
    });

    let file_layer = match &toml_config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Waits for Ctrl+C / SIGTERM, then cancels in-flight batches
async fn shutdown_signal(shutdown: CancellationToken) {
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    shutdown.cancel();
}

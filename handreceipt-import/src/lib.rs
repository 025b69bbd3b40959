//! handreceipt-import library interface
//!
//! Reconciles DA Form 2062 hand-receipt extractions into inventory records:
//! adapter → validator → quantity expansion → atomic create → NSN enrichment
//! → audit ledger. Exposed as a library for the binary and integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod models;
pub mod services;
pub mod types;
pub mod utils;
pub mod validators;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use handreceipt_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::services::BatchImportOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub event_bus: EventBus,
    pub orchestrator: Arc<BatchImportOrchestrator>,
    /// Cancelled on shutdown; in-flight batches stop scheduling new units
    pub shutdown: CancellationToken,
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, orchestrator: BatchImportOrchestrator) -> Self {
        Self {
            db,
            event_bus,
            orchestrator: Arc::new(orchestrator),
            shutdown: CancellationToken::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::health_routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

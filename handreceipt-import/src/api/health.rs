//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" once an error has been recorded
    pub status: String,
    pub module: String,
    pub version: String,
    /// Short git hash and cargo profile of this build
    pub build: String,
    pub uptime_seconds: u64,
    /// Whether NSN enrichment is configured
    pub nsn_enrichment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let last_error = state.last_error.read().await.clone();
    let status = if last_error.is_some() { "degraded" } else { "ok" };

    Json(HealthResponse {
        status: status.to_string(),
        module: "handreceipt-import".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: format!("{} ({})", env!("GIT_HASH"), env!("BUILD_PROFILE")),
        uptime_seconds,
        nsn_enrichment: state.orchestrator.has_enricher(),
        last_error,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

//! Batch import API handlers
//!
//! POST /imports, GET /imports/{id}, GET /imports/{id}/ledger

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{BatchImportRequest, BatchImportResult, LedgerEntry, OverallStatus};
use crate::AppState;

/// Response status for a finished batch
pub fn status_for(overall: OverallStatus) -> StatusCode {
    match overall {
        OverallStatus::Success => StatusCode::CREATED,
        OverallStatus::PartialSuccess => StatusCode::PARTIAL_CONTENT,
        OverallStatus::Failure => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// POST /imports
///
/// Runs the batch to completion and returns the per-item report. Request
/// problems (no actor, empty batch, both input kinds) are rejected before any
/// item is tried.
pub async fn create_import(
    State(state): State<AppState>,
    Json(request): Json<BatchImportRequest>,
) -> ApiResult<Response> {
    let actor = request.actor.trim().to_string();
    let form_reference = request.form_reference.clone();

    let result = state.orchestrator.run(request, &state.shutdown).await?;

    if let Err(e) =
        db::imports::save_batch_result(&state.db, &result, &actor, form_reference.as_deref()).await
    {
        // Properties are already committed; the report still goes back to the caller
        tracing::error!(batch_id = %result.batch_id, error = %e, "Failed to save import history");
        *state.last_error.write().await =
            Some(format!("import history not saved for batch {}: {}", result.batch_id, e));
    }

    Ok((status_for(result.overall_status), Json(result)).into_response())
}

/// GET /imports/{id}
pub async fn get_import(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<BatchImportResult>> {
    db::imports::load_batch_result(&state.db, batch_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Import batch {}", batch_id)))
}

/// GET /imports/{id}/ledger
pub async fn get_import_ledger(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<Vec<LedgerEntry>>> {
    let entries = db::ledger::list_entries(&state.db, batch_id).await?;
    if entries.is_empty() {
        return Err(ApiError::NotFound(format!("Ledger entries for batch {}", batch_id)));
    }
    Ok(Json(entries))
}

pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/imports", post(create_import))
        .route("/imports/:id", get(get_import))
        .route("/imports/:id/ledger", get(get_import_ledger))
}

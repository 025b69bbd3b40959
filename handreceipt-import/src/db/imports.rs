//! Import history
//!
//! Each finished batch is stored as a header row plus one row per outcome so
//! that a report can be fetched again by batch id.

use chrono::Utc;
use handreceipt_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{BatchImportResult, ImportOutcome, OutcomeStatus, OverallStatus};
use crate::utils::retry_on_lock;

/// Lock wait for history writes; the report is already computed at this point
const HISTORY_LOCK_WAIT_MS: u64 = 5000;

pub async fn save_batch_result(
    pool: &SqlitePool,
    result: &BatchImportResult,
    actor: &str,
    form_reference: Option<&str>,
) -> Result<()> {
    // Serialize everything before touching the database
    let batch_id = result.batch_id.to_string();
    let ledger_warnings = serde_json::to_string(&result.ledger_warnings)?;
    let adapter_notes = serde_json::to_string(&result.adapter_notes)?;
    let recorded_at = Utc::now().to_rfc3339();
    let items = result
        .items
        .iter()
        .map(|o| Ok::<_, Error>((o, serde_json::to_string(o)?)))
        .collect::<Result<Vec<_>>>()?;

    retry_on_lock("save batch result", HISTORY_LOCK_WAIT_MS, || {
        let (batch_id, ledger_warnings, adapter_notes, recorded_at, items) =
            (&batch_id, &ledger_warnings, &adapter_notes, &recorded_at, &items);
        async move {
            let mut tx = pool.begin().await?;

            sqlx::query(
                r#"
                INSERT INTO import_batches (
                    batch_id, actor, form_reference, total, created, skipped, invalid, failed,
                    overall_status, cancelled, ledger_summary_reference, ledger_warnings,
                    adapter_notes, recorded_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(batch_id)
            .bind(actor)
            .bind(form_reference)
            .bind(result.total as i64)
            .bind(result.created as i64)
            .bind(result.skipped as i64)
            .bind(result.invalid as i64)
            .bind(result.failed as i64)
            .bind(result.overall_status.as_str())
            .bind(result.cancelled)
            .bind(result.ledger_summary_reference.map(|id| id.to_string()))
            .bind(ledger_warnings)
            .bind(adapter_notes)
            .bind(recorded_at)
            .execute(&mut *tx)
            .await?;

            for (outcome, json) in items {
                sqlx::query(
                    r#"
                    INSERT INTO import_batch_items (
                        batch_id, input_index, unit_index, status, property_id, outcome
                    ) VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(batch_id)
                .bind(outcome.input_index as i64)
                .bind(outcome.unit_index.map(i64::from))
                .bind(status_str(outcome.status))
                .bind(outcome.property_id.map(|id| id.to_string()))
                .bind(json)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(())
        }
    })
    .await?;

    tracing::debug!(batch_id = %result.batch_id, items = result.items.len(), "Batch result saved");
    Ok(())
}

pub async fn load_batch_result(pool: &SqlitePool, batch_id: Uuid) -> Result<Option<BatchImportResult>> {
    let row = sqlx::query(
        r#"
        SELECT total, created, skipped, invalid, failed, overall_status, cancelled,
               ledger_summary_reference, ledger_warnings, adapter_notes
        FROM import_batches
        WHERE batch_id = ?
        "#,
    )
    .bind(batch_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let overall_status: String = row.get("overall_status");
    let overall_status = parse_overall_status(&overall_status)?;
    let summary_ref: Option<String> = row.get("ledger_summary_reference");
    let ledger_summary_reference = summary_ref
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Bad ledger reference for batch {}: {}", batch_id, e)))?;
    let ledger_warnings: String = row.get("ledger_warnings");
    let adapter_notes: String = row.get("adapter_notes");

    Ok(Some(BatchImportResult {
        batch_id,
        total: row.get::<i64, _>("total") as usize,
        created: row.get::<i64, _>("created") as usize,
        skipped: row.get::<i64, _>("skipped") as usize,
        invalid: row.get::<i64, _>("invalid") as usize,
        failed: row.get::<i64, _>("failed") as usize,
        overall_status,
        items: load_batch_items(pool, batch_id).await?,
        ledger_summary_reference,
        ledger_warnings: serde_json::from_str(&ledger_warnings)?,
        adapter_notes: serde_json::from_str(&adapter_notes)?,
        cancelled: row.get("cancelled"),
    }))
}

/// Outcomes of one batch in `(input_index, unit_index)` order
pub async fn load_batch_items(pool: &SqlitePool, batch_id: Uuid) -> Result<Vec<ImportOutcome>> {
    let outcomes: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT outcome FROM import_batch_items
        WHERE batch_id = ?
        ORDER BY input_index, COALESCE(unit_index, -1)
        "#,
    )
    .bind(batch_id.to_string())
    .fetch_all(pool)
    .await?;

    outcomes
        .iter()
        .map(|json| serde_json::from_str(json).map_err(Into::into))
        .collect()
}

fn status_str(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Created => "created",
        OutcomeStatus::Skipped => "skipped",
        OutcomeStatus::Invalid => "invalid",
        OutcomeStatus::Failed => "failed",
    }
}

fn parse_overall_status(s: &str) -> Result<OverallStatus> {
    match s {
        "success" => Ok(OverallStatus::Success),
        "partial_success" => Ok(OverallStatus::PartialSuccess),
        "failure" => Ok(OverallStatus::Failure),
        other => Err(Error::Internal(format!("Unknown overall status: {}", other))),
    }
}

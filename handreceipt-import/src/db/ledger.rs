//! Append-only audit ledger

use async_trait::async_trait;
use chrono::Utc;
use handreceipt_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{LedgerEntry, LedgerReceipt};
use crate::types::{Ledger, LedgerError};

#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn append(&self, entry: &LedgerEntry) -> std::result::Result<LedgerReceipt, LedgerError> {
        let payload =
            serde_json::to_string(entry).map_err(|e| LedgerError::Rejected(e.to_string()))?;
        let receipt = LedgerReceipt {
            entry_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (entry_id, batch_id, property_id, event_type, payload, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(receipt.entry_id.to_string())
        .bind(entry.batch_id().to_string())
        .bind(entry.property_id().map(|id| id.to_string()))
        .bind(entry.event_type())
        .bind(payload)
        .bind(receipt.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        Ok(receipt)
    }
}

/// Entries for one batch in append order
pub async fn list_entries(pool: &SqlitePool, batch_id: Uuid) -> Result<Vec<LedgerEntry>> {
    let payloads: Vec<String> =
        sqlx::query_scalar("SELECT payload FROM ledger_entries WHERE batch_id = ? ORDER BY seq")
            .bind(batch_id.to_string())
            .fetch_all(pool)
            .await?;

    payloads
        .iter()
        .map(|p| serde_json::from_str(p).map_err(Into::into))
        .collect()
}

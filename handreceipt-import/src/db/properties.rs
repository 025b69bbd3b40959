//! Property inventory
//!
//! `SqlitePropertyStore` backs both the duplicate lookup and the atomic create.
//! The UNIQUE constraint on `serial_number` is the final arbiter when two
//! batches race for the same serial.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use handreceipt_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{ImportMetadata, NsnDetails, ValidatedUnit};
use crate::types::{ExistingInventoryLookup, PropertyStore, StoreError};
use crate::utils::retry_on_lock;

/// Property row joined with its import provenance
#[derive(Debug, Clone)]
pub struct PropertyRecord {
    pub id: Uuid,
    pub name: String,
    pub serial_number: String,
    pub nsn: Option<String>,
    pub holder: String,
    pub verified: bool,
    pub nsn_details: Option<NsnDetails>,
    pub metadata: ImportMetadata,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SqlitePropertyStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqlitePropertyStore {
    pub fn new(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            pool,
            max_lock_wait_ms,
        }
    }

    async fn insert(&self, id: Uuid, unit: &ValidatedUnit, holder: &str) -> Result<()> {
        let id = id.to_string();
        let now = Utc::now().to_rfc3339();
        let metadata = serde_json::to_string(&unit.metadata)?;
        let verified = !unit.metadata.requires_verification;
        let pool = &self.pool;

        retry_on_lock("create property", self.max_lock_wait_ms, || {
            let (id, now, metadata) = (&id, &now, &metadata);
            async move {
                let mut tx = pool.begin().await?;

                sqlx::query(
                    r#"
                    INSERT INTO properties (
                        id, name, serial_number, nsn, holder, verified, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(id)
                .bind(&unit.name)
                .bind(&unit.serial_number)
                .bind(&unit.nsn)
                .bind(holder)
                .bind(verified)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO property_import_metadata (
                        property_id, source, form_reference, confidence, serial_source,
                        requires_verification, metadata
                    ) VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(id)
                .bind(unit.metadata.source.as_str())
                .bind(&unit.metadata.form_reference)
                .bind(unit.metadata.confidence)
                .bind(unit.metadata.serial_source.as_str())
                .bind(unit.metadata.requires_verification)
                .bind(metadata)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok(())
            }
        })
        .await
    }
}

#[async_trait]
impl ExistingInventoryLookup for SqlitePropertyStore {
    async fn exists(&self, serial_number: &str) -> std::result::Result<bool, StoreError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM properties WHERE serial_number = ? LIMIT 1")
                .bind(serial_number.trim())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl PropertyStore for SqlitePropertyStore {
    async fn create_atomic(
        &self,
        unit: &ValidatedUnit,
        holder: &str,
    ) -> std::result::Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        match self.insert(id, unit, holder).await {
            Ok(()) => Ok(id),
            Err(e) if e.is_unique_violation() => {
                Err(StoreError::Duplicate(unit.serial_number.clone()))
            }
            Err(e) => Err(StoreError::Storage(e.to_string())),
        }
    }

    async fn attach_enrichment(
        &self,
        property_id: Uuid,
        details: &NsnDetails,
    ) -> std::result::Result<(), StoreError> {
        let payload =
            serde_json::to_string(details).map_err(|e| StoreError::Storage(e.to_string()))?;

        let updated = sqlx::query("UPDATE properties SET nsn_details = ?, updated_at = ? WHERE id = ?")
            .bind(payload)
            .bind(Utc::now().to_rfc3339())
            .bind(property_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Storage(format!("property {} not found", property_id)));
        }
        Ok(())
    }
}

pub async fn load_property(pool: &SqlitePool, property_id: Uuid) -> Result<Option<PropertyRecord>> {
    let row = sqlx::query(
        r#"
        SELECT p.id, p.name, p.serial_number, p.nsn, p.holder, p.verified, p.nsn_details,
               p.created_at, m.metadata
        FROM properties p
        JOIN property_import_metadata m ON m.property_id = p.id
        WHERE p.id = ?
        "#,
    )
    .bind(property_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let nsn_details: Option<String> = row.get("nsn_details");
    let nsn_details = nsn_details
        .map(|json| serde_json::from_str::<NsnDetails>(&json))
        .transpose()?;
    let metadata: String = row.get("metadata");
    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Bad created_at for {}: {}", property_id, e)))?
        .with_timezone(&Utc);

    Ok(Some(PropertyRecord {
        id: property_id,
        name: row.get("name"),
        serial_number: row.get("serial_number"),
        nsn: row.get("nsn"),
        holder: row.get("holder"),
        verified: row.get("verified"),
        nsn_details,
        metadata: serde_json::from_str(&metadata)?,
        created_at,
    }))
}

pub async fn count_properties(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM properties")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

//! Audit ledger writer
//!
//! Appends one `PropertyCreated` entry per created unit and one
//! `ImportSummary` per batch. Append failures are logged and returned as
//! `LedgerWarning`s; they never undo a committed property. A property whose
//! ledger entry failed is therefore missing from the ledger until an operator
//! reconciles it from the batch warnings.

use chrono::Utc;
use std::sync::Arc;

use crate::models::{
    BatchImportResult, ConfidenceBands, ImportContext, LedgerEntry, LedgerReceipt, LedgerWarning,
    ValidatedUnit,
};
use crate::types::Ledger;

/// Batches larger than this are summarised by statistics instead of a list
const LISTED_SUMMARY_LIMIT: usize = 10;

/// Created unit as it appears in the batch summary
#[derive(Debug, Clone)]
pub struct CreatedUnitSummary {
    pub name: String,
    pub serial_number: String,
    pub nsn: Option<String>,
    pub confidence: f64,
}

impl From<&ValidatedUnit> for CreatedUnitSummary {
    fn from(unit: &ValidatedUnit) -> Self {
        Self {
            name: unit.name.clone(),
            serial_number: unit.serial_number.clone(),
            nsn: unit.nsn.clone(),
            confidence: unit.metadata.confidence,
        }
    }
}

#[derive(Clone)]
pub struct AuditLedgerWriter {
    ledger: Arc<dyn Ledger>,
}

impl AuditLedgerWriter {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn record_unit(
        &self,
        unit: &ValidatedUnit,
        property_id: uuid::Uuid,
        ctx: &ImportContext,
    ) -> Result<LedgerReceipt, LedgerWarning> {
        let entry = LedgerEntry::PropertyCreated {
            batch_id: ctx.batch_id,
            property_id,
            name: unit.name.clone(),
            serial_number: unit.serial_number.clone(),
            nsn: unit.nsn.clone(),
            form_reference: unit.metadata.form_reference.clone(),
            actor: ctx.actor.clone(),
            timestamp: Utc::now(),
        };

        self.ledger.append(&entry).await.map_err(|e| {
            tracing::warn!(
                batch_id = %ctx.batch_id,
                property_id = %property_id,
                serial = %unit.serial_number,
                error = %e,
                "Ledger append failed for created property"
            );
            LedgerWarning {
                property_id: Some(property_id),
                message: format!(
                    "ledger entry for serial {} not recorded: {}",
                    unit.serial_number, e
                ),
            }
        })
    }

    pub async fn record_summary(
        &self,
        ctx: &ImportContext,
        result: &BatchImportResult,
        created: &[CreatedUnitSummary],
    ) -> Result<LedgerReceipt, LedgerWarning> {
        let mut confidence = ConfidenceBands::default();
        for unit in created {
            confidence.record(unit.confidence);
        }

        let entry = LedgerEntry::ImportSummary {
            batch_id: ctx.batch_id,
            actor: ctx.actor.clone(),
            form_reference: ctx.form_reference.clone(),
            unit_name: ctx.unit.unit_name.clone(),
            dodaac: ctx.unit.dodaac.clone(),
            total: result.total,
            created: result.created,
            skipped: result.skipped,
            invalid: result.invalid,
            failed: result.failed,
            confidence,
            summary: summary_text(created, &confidence),
            cancelled: result.cancelled,
            timestamp: Utc::now(),
        };

        self.ledger.append(&entry).await.map_err(|e| {
            tracing::warn!(
                batch_id = %ctx.batch_id,
                error = %e,
                "Ledger append failed for batch summary"
            );
            LedgerWarning {
                property_id: None,
                message: format!("batch summary not recorded: {}", e),
            }
        })
    }
}

/// `Name (SN: x) [NSN: y]` list for small batches, band counts for large ones
pub fn summary_text(created: &[CreatedUnitSummary], bands: &ConfidenceBands) -> String {
    if created.is_empty() {
        return "no items imported".to_string();
    }

    if created.len() > LISTED_SUMMARY_LIMIT {
        return format!(
            "{} items imported: {} high confidence, {} medium confidence, {} low confidence",
            created.len(),
            bands.high,
            bands.medium,
            bands.low
        );
    }

    created
        .iter()
        .map(|unit| match &unit.nsn {
            Some(nsn) => format!("{} (SN: {}) [NSN: {}]", unit.name, unit.serial_number, nsn),
            None => format!("{} (SN: {})", unit.name, unit.serial_number),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

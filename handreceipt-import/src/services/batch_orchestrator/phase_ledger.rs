//! Batch summary ledger entry

use super::BatchImportOrchestrator;
use crate::models::{BatchImportResult, ImportContext};
use crate::services::ledger_writer::CreatedUnitSummary;

impl BatchImportOrchestrator {
    /// One summary per batch, written after every unit has settled
    pub(super) async fn phase_ledger(
        &self,
        ctx: &ImportContext,
        result: &mut BatchImportResult,
        created: &[CreatedUnitSummary],
    ) {
        match self.ledger.record_summary(ctx, result, created).await {
            Ok(receipt) => {
                result.ledger_summary_reference = Some(receipt.entry_id);
            }
            Err(warning) => {
                result.ledger_warnings.push(warning);
            }
        }
    }
}

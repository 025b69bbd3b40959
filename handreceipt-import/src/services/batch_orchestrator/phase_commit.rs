//! Commit phase: atomic create → enrichment → per-unit ledger entry
//!
//! Units run on a pool of `max_workers` via `buffer_unordered`. Each unit's
//! failure is isolated to its own outcome.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use handreceipt_common::events::ImportEvent;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::phase_validation::cancelled;
use super::{BatchImportOrchestrator, CommitResult};
use crate::models::{
    EnrichmentStatus, ImportContext, ImportOutcome, OutcomeReason, OutcomeStatus, ReasonCode,
    ValidatedUnit,
};
use crate::services::ledger_writer::CreatedUnitSummary;
use crate::types::StoreError;

impl BatchImportOrchestrator {
    pub(super) async fn phase_commit(
        &self,
        ctx: &ImportContext,
        pending: Vec<ValidatedUnit>,
        cancel: &CancellationToken,
    ) -> Vec<CommitResult> {
        let workers = self.settings.max_workers.max(1);
        tracing::debug!(
            batch_id = %ctx.batch_id,
            units = pending.len(),
            workers,
            "Commit phase starting"
        );

        stream::iter(pending)
            .map(|unit| self.commit_unit(ctx, unit, cancel))
            .buffer_unordered(workers)
            .collect()
            .await
    }

    async fn commit_unit(
        &self,
        ctx: &ImportContext,
        unit: ValidatedUnit,
        cancel: &CancellationToken,
    ) -> CommitResult {
        if cancel.is_cancelled() {
            return CommitResult {
                outcome: cancelled(unit.input_index, unit.unit_index, &unit.serial_number),
                created: None,
                ledger_warning: None,
            };
        }

        let property_id = match self.store.create_atomic(&unit, &ctx.actor).await {
            Ok(id) => id,
            Err(StoreError::Duplicate(_)) => {
                // Lost a race with another batch; the store's constraint is authoritative
                return rejected(
                    &unit,
                    OutcomeStatus::Invalid,
                    OutcomeReason::new(
                        ReasonCode::Duplicate,
                        format!("serial number {} already exists in inventory", unit.serial_number),
                    ),
                );
            }
            Err(StoreError::Storage(message)) => {
                tracing::error!(
                    batch_id = %ctx.batch_id,
                    input_index = unit.input_index,
                    serial = %unit.serial_number,
                    error = %message,
                    "Property creation failed"
                );
                return rejected(
                    &unit,
                    OutcomeStatus::Failed,
                    OutcomeReason::new(ReasonCode::PersistenceFailed, message),
                );
            }
        };

        tracing::debug!(
            batch_id = %ctx.batch_id,
            property_id = %property_id,
            serial = %unit.serial_number,
            "Property created"
        );
        self.emit(ImportEvent::UnitCommitted {
            batch_id: ctx.batch_id,
            input_index: unit.input_index,
            unit_index: unit.unit_index,
            property_id,
            timestamp: Utc::now(),
        });

        let enrichment = self.enrich_unit(property_id, &unit, cancel).await;
        let ledger_warning = self.ledger.record_unit(&unit, property_id, ctx).await.err();

        CommitResult {
            outcome: ImportOutcome::created(
                unit.input_index,
                unit.unit_index,
                property_id,
                unit.serial_number.clone(),
                enrichment,
                unit.metadata.verification_reasons.clone(),
            ),
            created: Some(CreatedUnitSummary::from(&unit)),
            ledger_warning,
        }
    }

    /// Best effort; the returned status is informational only
    async fn enrich_unit(
        &self,
        property_id: Uuid,
        unit: &ValidatedUnit,
        cancel: &CancellationToken,
    ) -> EnrichmentStatus {
        let (Some(enricher), Some(nsn)) = (&self.enricher, unit.nsn.as_deref()) else {
            return EnrichmentStatus::Skipped;
        };
        if cancel.is_cancelled() {
            return EnrichmentStatus::Skipped;
        }

        let outcome = enricher.enrich(nsn).await;
        let Some(details) = outcome.details else {
            return outcome.status;
        };

        match self.store.attach_enrichment(property_id, &details).await {
            Ok(()) => EnrichmentStatus::Enriched,
            Err(e) => {
                tracing::warn!(
                    property_id = %property_id,
                    nsn = %nsn,
                    error = %e,
                    "Could not store NSN details"
                );
                EnrichmentStatus::Unavailable
            }
        }
    }
}

fn rejected(unit: &ValidatedUnit, status: OutcomeStatus, reason: OutcomeReason) -> CommitResult {
    CommitResult {
        outcome: ImportOutcome::rejected(
            unit.input_index,
            Some(unit.unit_index),
            status,
            reason,
            Some(unit.serial_number.clone()),
        ),
        created: None,
        ledger_warning: None,
    }
}

//! Batch import orchestrator
//!
//! Drives one batch through reconciliation:
//!
//! 1. **Adapt** raw extraction lines (or pre-parsed candidates) into items
//! 2. **Validate + expand** sequentially, in input order (`phase_validation`)
//! 3. **Commit** each surviving unit atomically, then enrich and append its
//!    ledger entry, on a bounded worker pool (`phase_commit`)
//! 4. **Summarize** into one ledger entry per batch (`phase_ledger`)
//!
//! Outcomes are reassembled in `(input_index, unit_index)` order regardless of
//! completion order. Per-unit failures never abort the batch; only a
//! malformed or oversized request is fatal, and it is rejected before any
//! unit is tried. Oversized includes quantities that would expand past
//! `max_batch_items`.

use std::sync::Arc;

use chrono::Utc;
use handreceipt_common::config::ImportSettings;
use handreceipt_common::events::{EventBus, ImportEvent};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::extraction::ExtractionAdapter;
use crate::models::{
    BatchImportRequest, BatchImportResult, ImportContext, ImportOutcome, LedgerWarning, UnitInfo,
    ValidatedUnit,
};
use crate::services::ledger_writer::{AuditLedgerWriter, CreatedUnitSummary};
use crate::services::nsn_enricher::NsnEnricher;
use crate::services::quantity_expander::QuantityExpander;
use crate::types::{ExistingInventoryLookup, Extractor, ImportError, Ledger, PropertyStore};

mod phase_commit;
mod phase_ledger;
mod phase_validation;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Concurrent commit workers
    pub max_workers: usize,
    /// Bounds both submitted items and outcomes after quantity expansion
    pub max_batch_items: usize,
    pub review_confidence_threshold: f64,
    pub suspicious_quantity_threshold: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&ImportSettings::default())
    }
}

impl From<&ImportSettings> for OrchestratorSettings {
    fn from(settings: &ImportSettings) -> Self {
        Self {
            max_workers: settings.max_workers.max(1),
            max_batch_items: settings.max_batch_items,
            review_confidence_threshold: settings.review_confidence_threshold,
            suspicious_quantity_threshold: settings.suspicious_quantity_threshold,
        }
    }
}

fn adapter_for(settings: &OrchestratorSettings) -> ExtractionAdapter {
    ExtractionAdapter::new(settings.review_confidence_threshold)
        .with_suspicious_quantity(settings.suspicious_quantity_threshold)
}

/// Terminal outcomes decided during validation plus units ready to commit
struct ValidationPlan {
    outcomes: Vec<ImportOutcome>,
    pending: Vec<ValidatedUnit>,
}

/// What one commit worker hands back
struct CommitResult {
    outcome: ImportOutcome,
    created: Option<CreatedUnitSummary>,
    ledger_warning: Option<LedgerWarning>,
}

pub struct BatchImportOrchestrator {
    lookup: Arc<dyn ExistingInventoryLookup>,
    store: Arc<dyn PropertyStore>,
    ledger: AuditLedgerWriter,
    enricher: Option<Arc<NsnEnricher>>,
    event_bus: Option<EventBus>,
    adapter: ExtractionAdapter,
    settings: OrchestratorSettings,
    default_unit: Option<UnitInfo>,
}

impl BatchImportOrchestrator {
    pub fn new(
        lookup: Arc<dyn ExistingInventoryLookup>,
        store: Arc<dyn PropertyStore>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        let settings = OrchestratorSettings::default();
        Self {
            lookup,
            store,
            ledger: AuditLedgerWriter::new(ledger),
            enricher: None,
            event_bus: None,
            adapter: adapter_for(&settings),
            settings,
            default_unit: None,
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<NsnEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.adapter = adapter_for(&settings);
        self.settings = settings;
        self
    }

    pub fn with_default_unit(mut self, unit: Option<UnitInfo>) -> Self {
        self.default_unit = unit;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn has_enricher(&self) -> bool {
        self.enricher.is_some()
    }

    /// Run a batch to completion (or cancellation)
    pub async fn run(
        &self,
        request: BatchImportRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchImportResult, ImportError> {
        request.validate(self.settings.max_batch_items)?;

        let ctx = ImportContext {
            batch_id: Uuid::new_v4(),
            actor: request.actor.trim().to_string(),
            form_reference: request.form_reference.clone(),
            unit: request
                .unit
                .clone()
                .or_else(|| self.default_unit.clone())
                .unwrap_or_default(),
            source: request.source(),
        };

        // Step 1: adapt
        let (items, adapter_notes) = if request.raw_lines.is_empty() {
            let items = self
                .adapter
                .from_candidates(&request.candidates, ctx.form_reference.as_deref());
            (items, Vec::new())
        } else {
            let output = self
                .adapter
                .adapt(&request.raw_lines, ctx.form_reference.as_deref());
            (output.items, output.notes)
        };

        let planned = QuantityExpander::planned_outcomes(&items);
        if planned > self.settings.max_batch_items as u64 {
            tracing::warn!(
                batch_id = %ctx.batch_id,
                planned,
                max = self.settings.max_batch_items,
                "Rejecting batch: expanded quantity exceeds batch limit"
            );
            return Err(ImportError::TooManyItems {
                count: usize::try_from(planned).unwrap_or(usize::MAX),
                max: self.settings.max_batch_items,
            });
        }

        tracing::info!(
            batch_id = %ctx.batch_id,
            actor = %ctx.actor,
            source = ctx.source.as_str(),
            items = items.len(),
            dropped_lines = adapter_notes.len(),
            "Batch import started"
        );
        self.emit(ImportEvent::BatchStarted {
            batch_id: ctx.batch_id,
            item_count: items.len(),
            timestamp: Utc::now(),
        });

        // Step 2: validate + expand (sequential, input order)
        let plan = self.phase_validation(&ctx, &items, cancel).await;

        // Steps 3-5: commit, enrich, per-unit ledger (concurrent)
        let mut commits = self.phase_commit(&ctx, plan.pending, cancel).await;

        let mut outcomes = plan.outcomes;
        let mut created = Vec::new();
        let mut ledger_warnings = Vec::new();
        commits.sort_by_key(|c| c.outcome.position());
        for commit in commits {
            outcomes.push(commit.outcome);
            created.extend(commit.created);
            ledger_warnings.extend(commit.ledger_warning);
        }

        let mut result = BatchImportResult::from_outcomes(ctx.batch_id, outcomes);
        result.adapter_notes = adapter_notes;
        result.ledger_warnings = ledger_warnings;
        result.cancelled = cancel.is_cancelled();

        // Step 6: batch summary
        self.phase_ledger(&ctx, &mut result, &created).await;

        tracing::info!(
            batch_id = %ctx.batch_id,
            total = result.total,
            created = result.created,
            skipped = result.skipped,
            invalid = result.invalid,
            failed = result.failed,
            status = result.overall_status.as_str(),
            cancelled = result.cancelled,
            ledger_warnings = result.ledger_warnings.len(),
            "Batch import completed"
        );
        self.emit(ImportEvent::BatchCompleted {
            batch_id: ctx.batch_id,
            created: result.created,
            skipped: result.skipped,
            invalid: result.invalid,
            failed: result.failed,
            overall_status: result.overall_status.as_str().to_string(),
            cancelled: result.cancelled,
            timestamp: Utc::now(),
        });

        Ok(result)
    }

    /// Extract a scanned document, then run the resulting lines as a batch
    ///
    /// `header` supplies actor, form reference and unit; any lines or
    /// candidates it carries are replaced by the extraction output.
    pub async fn run_document(
        &self,
        extractor: &dyn Extractor,
        document: &[u8],
        mut header: BatchImportRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchImportResult, ImportError> {
        let lines = extractor.extract(document).await?;
        tracing::debug!(
            extractor = extractor.name(),
            lines = lines.len(),
            "Document extracted"
        );

        header.raw_lines = lines;
        header.candidates.clear();
        self.run(header, cancel).await
    }

    fn emit(&self, event: ImportEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }
}

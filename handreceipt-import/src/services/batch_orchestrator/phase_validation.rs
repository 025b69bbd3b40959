//! Validation and quantity expansion phase
//!
//! Runs strictly in input order so that duplicate-in-batch resolution is
//! deterministic (first valid occurrence wins) before any concurrent work.

use tokio_util::sync::CancellationToken;

use super::{BatchImportOrchestrator, ValidationPlan};
use crate::models::{
    ImportContext, ImportOutcome, OutcomeReason, OutcomeStatus, ParsedItem, ReasonCode,
};
use crate::services::quantity_expander::QuantityExpander;
use crate::validators::{ItemValidator, StructuralVerdict, UnitVerdict};

impl BatchImportOrchestrator {
    pub(super) async fn phase_validation(
        &self,
        ctx: &ImportContext,
        items: &[ParsedItem],
        cancel: &CancellationToken,
    ) -> ValidationPlan {
        let mut validator = ItemValidator::new();
        let mut plan = ValidationPlan {
            outcomes: Vec::new(),
            pending: Vec::new(),
        };

        for item in items {
            let warnings = match ItemValidator::check_structure(item) {
                StructuralVerdict::Valid { warnings } => warnings,
                StructuralVerdict::Skipped(reason) => {
                    plan.outcomes.push(ImportOutcome::rejected(
                        item.input_index,
                        None,
                        OutcomeStatus::Skipped,
                        reason,
                        None,
                    ));
                    continue;
                }
                StructuralVerdict::Invalid(reason) => {
                    plan.outcomes.push(ImportOutcome::rejected(
                        item.input_index,
                        None,
                        OutcomeStatus::Invalid,
                        reason,
                        item.serial_number.clone(),
                    ));
                    continue;
                }
            };

            let expansion = QuantityExpander::expand(item, ctx, &warnings);
            plan.outcomes.extend(expansion.shortfall);

            for unit in expansion.units {
                if cancel.is_cancelled() {
                    plan.outcomes.push(cancelled(unit.input_index, unit.unit_index, &unit.serial_number));
                    continue;
                }

                match validator.check_unit(&unit, self.lookup.as_ref()).await {
                    UnitVerdict::Valid => plan.pending.push(unit),
                    UnitVerdict::Invalid(reason) => {
                        tracing::debug!(
                            batch_id = %ctx.batch_id,
                            input_index = unit.input_index,
                            serial = %unit.serial_number,
                            reason = reason.code.as_str(),
                            "Unit rejected"
                        );
                        plan.outcomes.push(ImportOutcome::rejected(
                            unit.input_index,
                            Some(unit.unit_index),
                            OutcomeStatus::Invalid,
                            reason,
                            Some(unit.serial_number),
                        ));
                    }
                    UnitVerdict::Failed(reason) => {
                        plan.outcomes.push(ImportOutcome::rejected(
                            unit.input_index,
                            Some(unit.unit_index),
                            OutcomeStatus::Failed,
                            reason,
                            Some(unit.serial_number),
                        ));
                    }
                }
            }
        }

        tracing::debug!(
            batch_id = %ctx.batch_id,
            pending = plan.pending.len(),
            settled = plan.outcomes.len(),
            "Validation phase complete"
        );
        plan
    }
}

pub(super) fn cancelled(input_index: usize, unit_index: u32, serial: &str) -> ImportOutcome {
    ImportOutcome::rejected(
        input_index,
        Some(unit_index),
        OutcomeStatus::Skipped,
        OutcomeReason::new(ReasonCode::Cancelled, "batch cancelled before unit was committed"),
        Some(serial.to_string()),
    )
}

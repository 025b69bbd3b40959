//! Batch import results
//!
//! Every input candidate (after quantity expansion) yields exactly one
//! `ImportOutcome`. Counts and the overall status are derived from the
//! outcome list, never tracked separately.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal status of one outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Created,
    Skipped,
    Invalid,
    Failed,
}

/// Structured reason attached to every non-Created outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    NoSerial,
    MissingField,
    Duplicate,
    DuplicateInBatch,
    InsufficientSerialsForQuantity,
    Cancelled,
    PersistenceFailed,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::NoSerial => "no-serial",
            ReasonCode::MissingField => "missing-field",
            ReasonCode::Duplicate => "duplicate",
            ReasonCode::DuplicateInBatch => "duplicate-in-batch",
            ReasonCode::InsufficientSerialsForQuantity => "insufficient-serials-for-quantity",
            ReasonCode::Cancelled => "cancelled",
            ReasonCode::PersistenceFailed => "persistence-failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeReason {
    pub code: ReasonCode,
    pub message: String,
}

impl OutcomeReason {
    pub fn new(code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Result of the best-effort NSN lookup for a created unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// Catalog details were written to the property
    Enriched,
    /// Catalog has no record for the NSN
    NotFound,
    /// Catalog unreachable after retries, or the write-back failed
    Unavailable,
    /// No usable NSN, or enrichment disabled
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub input_index: usize,
    /// Absent for item-level outcomes (no-serial, missing-field)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_index: Option<u32>,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<OutcomeReason>,
    /// Present iff `status == Created`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentStatus>,
    /// Verification reasons carried into the created record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ImportOutcome {
    pub fn created(
        input_index: usize,
        unit_index: u32,
        property_id: Uuid,
        serial_number: String,
        enrichment: EnrichmentStatus,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            input_index,
            unit_index: Some(unit_index),
            status: OutcomeStatus::Created,
            reason: None,
            property_id: Some(property_id),
            serial_number: Some(serial_number),
            enrichment: Some(enrichment),
            warnings,
        }
    }

    /// Non-Created outcome
    pub fn rejected(
        input_index: usize,
        unit_index: Option<u32>,
        status: OutcomeStatus,
        reason: OutcomeReason,
        serial_number: Option<String>,
    ) -> Self {
        debug_assert!(status != OutcomeStatus::Created);
        Self {
            input_index,
            unit_index,
            status,
            reason: Some(reason),
            property_id: None,
            serial_number,
            enrichment: None,
            warnings: Vec::new(),
        }
    }

    /// Sort key; item-level outcomes sort before any unit of the same input
    pub fn position(&self) -> (usize, Option<u32>) {
        (self.input_index, self.unit_index)
    }
}

/// Raw line dropped by the adapter (no name-like text)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterNote {
    pub line_indexes: Vec<usize>,
    pub text: String,
    pub message: String,
}

/// Ledger append that failed after the property was committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerWarning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Success,
    PartialSuccess,
    Failure,
}

impl OverallStatus {
    /// `Success` iff everything was created, `Failure` iff nothing was
    pub fn from_counts(created: usize, skipped: usize, invalid: usize, failed: usize) -> Self {
        if created == 0 {
            OverallStatus::Failure
        } else if skipped == 0 && invalid == 0 && failed == 0 {
            OverallStatus::Success
        } else {
            OverallStatus::PartialSuccess
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Success => "success",
            OverallStatus::PartialSuccess => "partial_success",
            OverallStatus::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchImportResult {
    pub batch_id: Uuid,
    pub total: usize,
    pub created: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub failed: usize,
    pub overall_status: OverallStatus,
    pub items: Vec<ImportOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_summary_reference: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ledger_warnings: Vec<LedgerWarning>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adapter_notes: Vec<AdapterNote>,
    #[serde(default)]
    pub cancelled: bool,
}

impl BatchImportResult {
    /// Sort outcomes into input order and derive the counts
    pub fn from_outcomes(batch_id: Uuid, mut items: Vec<ImportOutcome>) -> Self {
        items.sort_by_key(|o| o.position());

        let count = |status: OutcomeStatus| items.iter().filter(|o| o.status == status).count();
        let created = count(OutcomeStatus::Created);
        let skipped = count(OutcomeStatus::Skipped);
        let invalid = count(OutcomeStatus::Invalid);
        let failed = count(OutcomeStatus::Failed);

        Self {
            batch_id,
            total: items.len(),
            created,
            skipped,
            invalid,
            failed,
            overall_status: OverallStatus::from_counts(created, skipped, invalid, failed),
            items,
            ledger_summary_reference: None,
            ledger_warnings: Vec::new(),
            adapter_notes: Vec::new(),
            cancelled: false,
        }
    }

    /// Outcomes carrying a given reason code
    pub fn with_reason(&self, code: ReasonCode) -> impl Iterator<Item = &ImportOutcome> {
        self.items
            .iter()
            .filter(move |o| o.reason.as_ref().map(|r| r.code) == Some(code))
    }
}

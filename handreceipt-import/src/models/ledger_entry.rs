//! Audit ledger entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Created-unit counts by extraction confidence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBands {
    /// confidence >= 0.8
    pub high: usize,
    /// 0.6 <= confidence < 0.8
    pub medium: usize,
    pub low: usize,
}

impl ConfidenceBands {
    pub fn record(&mut self, confidence: f64) {
        if confidence >= 0.8 {
            self.high += 1;
        } else if confidence >= 0.6 {
            self.medium += 1;
        } else {
            self.low += 1;
        }
    }
}

/// Append-only ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LedgerEntry {
    /// One property created from a hand receipt line
    PropertyCreated {
        batch_id: Uuid,
        property_id: Uuid,
        name: String,
        serial_number: String,
        nsn: Option<String>,
        form_reference: Option<String>,
        actor: String,
        timestamp: DateTime<Utc>,
    },

    /// One per batch, written after all units are settled
    ImportSummary {
        batch_id: Uuid,
        actor: String,
        form_reference: Option<String>,
        unit_name: String,
        dodaac: Option<String>,
        total: usize,
        created: usize,
        skipped: usize,
        invalid: usize,
        failed: usize,
        confidence: ConfidenceBands,
        /// Human-readable list (small batches) or statistics (large batches)
        summary: String,
        cancelled: bool,
        timestamp: DateTime<Utc>,
    },
}

impl LedgerEntry {
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEntry::PropertyCreated { .. } => "property_created",
            LedgerEntry::ImportSummary { .. } => "import_summary",
        }
    }

    pub fn batch_id(&self) -> Uuid {
        match self {
            LedgerEntry::PropertyCreated { batch_id, .. }
            | LedgerEntry::ImportSummary { batch_id, .. } => *batch_id,
        }
    }

    pub fn property_id(&self) -> Option<Uuid> {
        match self {
            LedgerEntry::PropertyCreated { property_id, .. } => Some(*property_id),
            LedgerEntry::ImportSummary { .. } => None,
        }
    }
}

/// Acknowledgement returned by a successful append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub entry_id: Uuid,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_band_boundaries() {
        let mut bands = ConfidenceBands::default();
        for c in [0.95, 0.8, 0.79, 0.6, 0.59, 0.1] {
            bands.record(c);
        }
        assert_eq!(bands, ConfidenceBands { high: 2, medium: 2, low: 2 });
    }
}

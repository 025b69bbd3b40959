//! Batch import request and per-batch context

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::items::{CandidateItem, ImportSource, RawLine};
use crate::types::ImportError;

/// Receiving unit, passed explicitly with every batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitInfo {
    pub unit_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dodaac: Option<String>,
}

/// POST /imports body
///
/// Exactly one of `rawLines` / `candidates` must be non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchImportRequest {
    /// User performing the import; becomes the holder of created property
    pub actor: String,
    #[serde(default)]
    pub form_reference: Option<String>,
    /// Falls back to the configured default unit when absent
    #[serde(default)]
    pub unit: Option<UnitInfo>,
    #[serde(default)]
    pub raw_lines: Vec<RawLine>,
    #[serde(default)]
    pub candidates: Vec<CandidateItem>,
}

impl BatchImportRequest {
    pub fn from_candidates(actor: impl Into<String>, candidates: Vec<CandidateItem>) -> Self {
        Self {
            actor: actor.into(),
            candidates,
            ..Default::default()
        }
    }

    pub fn from_raw_lines(actor: impl Into<String>, raw_lines: Vec<RawLine>) -> Self {
        Self {
            actor: actor.into(),
            raw_lines,
            ..Default::default()
        }
    }

    pub fn with_form_reference(mut self, form_reference: impl Into<String>) -> Self {
        self.form_reference = Some(form_reference.into());
        self
    }

    pub fn with_unit(mut self, unit: UnitInfo) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn source(&self) -> ImportSource {
        if self.raw_lines.is_empty() {
            ImportSource::Da2062Candidates
        } else {
            ImportSource::Da2062Scan
        }
    }

    /// Batch-level checks; failing here means no unit is attempted
    pub fn validate(&self, max_items: usize) -> Result<(), ImportError> {
        if self.actor.trim().is_empty() {
            return Err(ImportError::MissingActor);
        }

        match (self.raw_lines.is_empty(), self.candidates.is_empty()) {
            (true, true) => return Err(ImportError::EmptyBatch),
            (false, false) => return Err(ImportError::AmbiguousInput),
            _ => {}
        }

        let count = self.raw_lines.len().max(self.candidates.len());
        if count > max_items {
            return Err(ImportError::TooManyItems { count, max: max_items });
        }

        if let Some(line) = self
            .raw_lines
            .iter()
            .position(|l| !(0.0..=1.0).contains(&l.confidence) || l.confidence.is_nan())
        {
            return Err(ImportError::Malformed(format!(
                "raw line {} has confidence outside [0, 1]",
                line
            )));
        }

        Ok(())
    }
}

/// Values shared by every unit of one batch
#[derive(Debug, Clone)]
pub struct ImportContext {
    pub batch_id: Uuid,
    pub actor: String,
    pub form_reference: Option<String>,
    pub unit: UnitInfo,
    pub source: ImportSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_malformed_requests() {
        let empty = BatchImportRequest::from_candidates("sgt.smith", vec![]);
        assert!(matches!(empty.validate(10), Err(ImportError::EmptyBatch)));

        let no_actor = BatchImportRequest::from_candidates("  ", vec![CandidateItem::default()]);
        assert!(matches!(no_actor.validate(10), Err(ImportError::MissingActor)));

        let mut both = BatchImportRequest::from_candidates("sgt.smith", vec![CandidateItem::default()]);
        both.raw_lines.push(RawLine::new("M4 CARBINE", 0.9));
        assert!(matches!(both.validate(10), Err(ImportError::AmbiguousInput)));

        let big = BatchImportRequest::from_candidates("sgt.smith", vec![CandidateItem::default(); 3]);
        assert!(matches!(
            big.validate(2),
            Err(ImportError::TooManyItems { count: 3, max: 2 })
        ));

        let bad_conf = BatchImportRequest::from_raw_lines("sgt.smith", vec![RawLine::new("X", 1.5)]);
        assert!(matches!(bad_conf.validate(10), Err(ImportError::Malformed(_))));
    }

    #[test]
    fn test_deserialize_camel_case_body() {
        let request: BatchImportRequest = serde_json::from_str(
            r#"{
                "actor": "sgt.smith",
                "formReference": "2062-0042",
                "unit": { "unitName": "A CO", "dodaac": "W91ABC" },
                "candidates": [
                    { "name": "M4 CARBINE", "serialNumber": "W123456", "quantity": 1 }
                ]
            }"#,
        )
        .unwrap();

        assert!(request.validate(10).is_ok());
        assert_eq!(request.source(), ImportSource::Da2062Candidates);
        assert_eq!(request.candidates[0].serial_number.as_deref(), Some("W123456"));
        assert_eq!(request.unit.unwrap().dodaac.as_deref(), Some("W91ABC"));
    }
}

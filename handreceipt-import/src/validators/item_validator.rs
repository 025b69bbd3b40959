//! Item validation
//!
//! Structural checks run once per parsed item, in this order:
//! 1. no serial (empty, whitespace, or only separators) → Skipped(no-serial)
//! 2. empty name → Invalid(missing-field)
//! 3. malformed NSN → warning only
//!
//! Duplicate checks run per expanded unit, strictly in input order:
//! 1. serial already in inventory → Invalid(duplicate)
//! 2. serial taken by an earlier valid unit of this batch → Invalid(duplicate-in-batch)
//!
//! Only units that pass are remembered, so the first valid occurrence wins.

use std::collections::HashSet;

use crate::extraction::nsn;
use crate::models::{OutcomeReason, ParsedItem, ReasonCode, ValidatedUnit};
use crate::services::quantity_expander::split_serials;
use crate::types::ExistingInventoryLookup;

pub const MALFORMED_NSN: &str = "malformed-nsn";

#[derive(Debug, Clone, PartialEq)]
pub enum StructuralVerdict {
    /// Proceed to expansion; warnings go into unit metadata
    Valid { warnings: Vec<String> },
    Skipped(OutcomeReason),
    Invalid(OutcomeReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitVerdict {
    Valid,
    Invalid(OutcomeReason),
    /// Inventory lookup itself failed
    Failed(OutcomeReason),
}

/// Per-batch validator; holds the serials accepted so far
#[derive(Debug, Default)]
pub struct ItemValidator {
    accepted_serials: HashSet<String>,
}

impl ItemValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_structure(item: &ParsedItem) -> StructuralVerdict {
        let has_serial = item
            .serial_number
            .as_deref()
            .map(|s| !split_serials(s).is_empty())
            .unwrap_or(false);

        if !has_serial {
            return StructuralVerdict::Skipped(OutcomeReason::new(
                ReasonCode::NoSerial,
                "item has no serial number; not imported",
            ));
        }

        if item.name.trim().is_empty() {
            return StructuralVerdict::Invalid(OutcomeReason::new(
                ReasonCode::MissingField,
                "item name is required",
            ));
        }

        let mut warnings = Vec::new();
        if let Some(value) = item.nsn.as_deref() {
            if !nsn::is_valid_format(value) {
                tracing::debug!(input_index = item.input_index, nsn = %value, "Malformed NSN");
                warnings.push(MALFORMED_NSN.to_string());
            }
        }

        StructuralVerdict::Valid { warnings }
    }

    pub async fn check_unit(
        &mut self,
        unit: &ValidatedUnit,
        lookup: &dyn ExistingInventoryLookup,
    ) -> UnitVerdict {
        let serial = unit.serial_number.as_str();

        match lookup.exists(serial).await {
            Ok(true) => {
                return UnitVerdict::Invalid(OutcomeReason::new(
                    ReasonCode::Duplicate,
                    format!("serial number {} already exists in inventory", serial),
                ));
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(serial = %serial, error = %e, "Inventory lookup failed");
                return UnitVerdict::Failed(OutcomeReason::new(
                    ReasonCode::PersistenceFailed,
                    format!("inventory lookup failed: {}", e),
                ));
            }
        }

        if !self.accepted_serials.insert(serial.to_string()) {
            return UnitVerdict::Invalid(OutcomeReason::new(
                ReasonCode::DuplicateInBatch,
                format!("serial number {} appears earlier in this batch", serial),
            ));
        }

        UnitVerdict::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImportMetadata, ImportSource, SerialSource};
    use crate::types::StoreError;
    use std::collections::HashSet;

    struct Inventory(HashSet<String>);

    #[async_trait::async_trait]
    impl ExistingInventoryLookup for Inventory {
        async fn exists(&self, serial_number: &str) -> Result<bool, StoreError> {
            Ok(self.0.contains(serial_number))
        }
    }

    struct Offline;

    #[async_trait::async_trait]
    impl ExistingInventoryLookup for Offline {
        async fn exists(&self, _serial_number: &str) -> Result<bool, StoreError> {
            Err(StoreError::Storage("disk I/O error".into()))
        }
    }

    fn parsed(name: &str, serial: Option<&str>, nsn: Option<&str>) -> ParsedItem {
        ParsedItem {
            input_index: 0,
            nsn: nsn.map(str::to_string),
            name: name.to_string(),
            serial_number: serial.map(str::to_string),
            quantity: 1,
            confidence: 0.9,
            serial_source: SerialSource::Explicit,
            source_line_indexes: vec![0],
            review_reasons: vec![],
            form_reference: None,
            original_quantity: 1,
        }
    }

    fn unit(input_index: usize, serial: &str) -> ValidatedUnit {
        ValidatedUnit {
            input_index,
            unit_index: 0,
            name: "CARBINE M4".to_string(),
            serial_number: serial.to_string(),
            nsn: None,
            metadata: ImportMetadata {
                source: ImportSource::Da2062Candidates,
                form_reference: None,
                confidence: 0.9,
                serial_source: SerialSource::Explicit,
                requires_verification: false,
                verification_reasons: vec![],
                original_quantity: 1,
                quantity_index: 0,
                extension: None,
            },
        }
    }

    #[test]
    fn test_no_serial_checked_before_name() {
        for serial in [None, Some(""), Some("   "), Some(" , ;")] {
            let verdict = ItemValidator::check_structure(&parsed("", serial, None));
            match verdict {
                StructuralVerdict::Skipped(reason) => assert_eq!(reason.code, ReasonCode::NoSerial),
                other => panic!("expected Skipped, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_name_is_invalid() {
        let verdict = ItemValidator::check_structure(&parsed("  ", Some("W1"), None));
        assert!(matches!(
            verdict,
            StructuralVerdict::Invalid(OutcomeReason { code: ReasonCode::MissingField, .. })
        ));
    }

    #[test]
    fn test_malformed_nsn_is_only_a_warning() {
        let verdict = ItemValidator::check_structure(&parsed("STRAP", Some("W1"), Some("58-55")));
        assert_eq!(
            verdict,
            StructuralVerdict::Valid {
                warnings: vec![MALFORMED_NSN.to_string()]
            }
        );

        let clean =
            ItemValidator::check_structure(&parsed("STRAP", Some("W1"), Some("5855-01-534-5931")));
        assert_eq!(clean, StructuralVerdict::Valid { warnings: vec![] });
    }

    #[tokio::test]
    async fn test_first_occurrence_wins() {
        let inventory = Inventory(HashSet::new());
        let mut validator = ItemValidator::new();

        assert_eq!(validator.check_unit(&unit(0, "W1"), &inventory).await, UnitVerdict::Valid);
        let second = validator.check_unit(&unit(1, "W1"), &inventory).await;
        assert!(matches!(
            second,
            UnitVerdict::Invalid(OutcomeReason { code: ReasonCode::DuplicateInBatch, .. })
        ));
    }

    #[tokio::test]
    async fn test_existing_serial_is_duplicate_and_not_remembered() {
        let inventory = Inventory(["W1".to_string()].into_iter().collect());
        let mut validator = ItemValidator::new();

        for index in 0..2 {
            let verdict = validator.check_unit(&unit(index, "W1"), &inventory).await;
            assert!(matches!(
                verdict,
                UnitVerdict::Invalid(OutcomeReason { code: ReasonCode::Duplicate, .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_is_failed() {
        let mut validator = ItemValidator::new();
        let verdict = validator.check_unit(&unit(0, "W1"), &Offline).await;
        assert!(matches!(
            verdict,
            UnitVerdict::Failed(OutcomeReason { code: ReasonCode::PersistenceFailed, .. })
        ));
    }
}

//! Quantity expansion
//!
//! A line with quantity N becomes one `ValidatedUnit` per distinct serial, up
//! to N. Missing serials become `Skipped(insufficient-serials-for-quantity)`
//! outcomes; extra serials are ignored and noted on the created units. No
//! serial is ever invented.

use crate::models::{
    ImportContext, ImportMetadata, ImportOutcome, OutcomeReason, OutcomeStatus, ParsedItem,
    ReasonCode, ValidatedUnit,
};

pub const SURPLUS_SERIALS: &str = "surplus-serials-ignored";
pub const QUANTITY_SHORTFALL: &str = "quantity-shortfall";

/// Distinct, trimmed serials from a `,` `;` or newline separated list
pub fn split_serials(raw: &str) -> Vec<String> {
    let mut serials: Vec<String> = Vec::new();
    for part in raw.split([',', ';', '\n', '\r']) {
        let serial = part.trim();
        if !serial.is_empty() && !serials.iter().any(|s| s == serial) {
            serials.push(serial.to_string());
        }
    }
    serials
}

#[derive(Debug, Clone, Default)]
pub struct Expansion {
    pub units: Vec<ValidatedUnit>,
    /// Skipped outcomes for units that had no serial
    pub shortfall: Vec<ImportOutcome>,
    /// Serials beyond the stated quantity
    pub surplus: Vec<String>,
}

pub struct QuantityExpander;

impl QuantityExpander {
    /// Upper bound on the outcomes a batch of items can produce. Items with
    /// serials expand to their quantity; anything else yields one outcome.
    pub fn planned_outcomes(items: &[ParsedItem]) -> u64 {
        items.iter().fold(0u64, |total, item| {
            let has_serials = item
                .serial_number
                .as_deref()
                .is_some_and(|raw| !split_serials(raw).is_empty());
            let units = if has_serials { u64::from(item.quantity.max(1)) } else { 1 };
            total.saturating_add(units)
        })
    }

    /// Expand a structurally valid item; `warnings` are validator notes
    /// (e.g. malformed NSN) carried into every unit's metadata
    pub fn expand(item: &ParsedItem, ctx: &ImportContext, warnings: &[String]) -> Expansion {
        let serials = item
            .serial_number
            .as_deref()
            .map(split_serials)
            .unwrap_or_default();

        let quantity = item.quantity.max(1) as usize;
        let created_count = quantity.min(serials.len());
        let surplus: Vec<String> = serials.iter().skip(quantity).cloned().collect();

        let mut reasons: Vec<String> = item.review_reasons.clone();
        for w in warnings {
            if !reasons.contains(w) {
                reasons.push(w.clone());
            }
        }
        if !surplus.is_empty() {
            reasons.push(SURPLUS_SERIALS.to_string());
        }
        if created_count < quantity {
            reasons.push(QUANTITY_SHORTFALL.to_string());
        }

        if !surplus.is_empty() {
            tracing::warn!(
                input_index = item.input_index,
                quantity,
                surplus = ?surplus,
                "Ignoring serials beyond stated quantity"
            );
        }

        let units = serials
            .iter()
            .take(created_count)
            .enumerate()
            .map(|(unit_index, serial)| ValidatedUnit {
                input_index: item.input_index,
                unit_index: unit_index as u32,
                name: item.name.clone(),
                serial_number: serial.clone(),
                nsn: item.nsn.clone(),
                metadata: ImportMetadata {
                    source: ctx.source,
                    form_reference: item
                        .form_reference
                        .clone()
                        .or_else(|| ctx.form_reference.clone()),
                    confidence: item.confidence,
                    serial_source: item.serial_source,
                    requires_verification: !reasons.is_empty(),
                    verification_reasons: reasons.clone(),
                    original_quantity: item.original_quantity,
                    quantity_index: unit_index as u32,
                    extension: None,
                },
            })
            .collect();

        let shortfall = (created_count..quantity)
            .map(|unit_index| {
                ImportOutcome::rejected(
                    item.input_index,
                    Some(unit_index as u32),
                    OutcomeStatus::Skipped,
                    OutcomeReason::new(
                        ReasonCode::InsufficientSerialsForQuantity,
                        format!(
                            "quantity {} lists {} serial(s); unit {} of {} not created",
                            quantity,
                            serials.len(),
                            unit_index + 1,
                            quantity
                        ),
                    ),
                    None,
                )
            })
            .collect();

        Expansion {
            units,
            shortfall,
            surplus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImportSource, SerialSource, UnitInfo};
    use uuid::Uuid;

    fn ctx() -> ImportContext {
        ImportContext {
            batch_id: Uuid::new_v4(),
            actor: "sgt.smith".to_string(),
            form_reference: Some("2062-0042".to_string()),
            unit: UnitInfo::default(),
            source: ImportSource::Da2062Candidates,
        }
    }

    fn item(serials: Option<&str>, quantity: u32) -> ParsedItem {
        ParsedItem {
            input_index: 3,
            nsn: Some("5855-01-534-5931".to_string()),
            name: "GOGGLE NV".to_string(),
            serial_number: serials.map(str::to_string),
            quantity,
            confidence: 0.9,
            serial_source: SerialSource::Explicit,
            source_line_indexes: vec![3],
            review_reasons: vec![],
            form_reference: None,
            original_quantity: quantity as i64,
        }
    }

    #[test]
    fn test_split_serials_distinct_in_order() {
        assert_eq!(split_serials("A1, A2;A3\nA1 , "), vec!["A1", "A2", "A3"]);
        assert!(split_serials(" ,; ").is_empty());
    }

    #[test]
    fn test_planned_outcomes_counts_expanded_units() {
        let items = vec![
            item(Some("N1"), 40),
            item(None, 7),
            item(Some(" , "), 9),
            item(Some("N2, N3"), u32::MAX),
        ];
        assert_eq!(QuantityExpander::planned_outcomes(&items[..3]), 42);
        assert_eq!(
            QuantityExpander::planned_outcomes(&items),
            42 + u64::from(u32::MAX)
        );
        assert_eq!(QuantityExpander::planned_outcomes(&[]), 0);
    }

    #[test]
    fn test_exact_serial_count() {
        let expansion = QuantityExpander::expand(&item(Some("N1, N2, N3"), 3), &ctx(), &[]);

        assert_eq!(expansion.units.len(), 3);
        assert!(expansion.shortfall.is_empty());
        let serials: Vec<_> = expansion.units.iter().map(|u| u.serial_number.as_str()).collect();
        assert_eq!(serials, vec!["N1", "N2", "N3"]);
        for (i, unit) in expansion.units.iter().enumerate() {
            assert_eq!(unit.unit_index, i as u32);
            assert_eq!(unit.metadata.quantity_index, i as u32);
            assert_eq!(unit.metadata.original_quantity, 3);
            assert_eq!(unit.metadata.form_reference.as_deref(), Some("2062-0042"));
            assert!(!unit.metadata.requires_verification);
        }
    }

    #[test]
    fn test_shortfall_is_skipped_not_invented() {
        let expansion = QuantityExpander::expand(&item(Some("N1"), 3), &ctx(), &[]);

        assert_eq!(expansion.units.len(), 1);
        assert_eq!(expansion.shortfall.len(), 2);
        for (offset, outcome) in expansion.shortfall.iter().enumerate() {
            assert_eq!(outcome.status, OutcomeStatus::Skipped);
            assert_eq!(outcome.unit_index, Some(offset as u32 + 1));
            assert_eq!(
                outcome.reason.as_ref().unwrap().code,
                ReasonCode::InsufficientSerialsForQuantity
            );
        }
        assert!(expansion.units[0]
            .metadata
            .verification_reasons
            .contains(&QUANTITY_SHORTFALL.to_string()));
    }

    #[test]
    fn test_surplus_ignored_with_warning() {
        let warnings = vec!["malformed-nsn".to_string()];
        let expansion = QuantityExpander::expand(&item(Some("N1, N2"), 1), &ctx(), &warnings);

        assert_eq!(expansion.units.len(), 1);
        assert_eq!(expansion.surplus, vec!["N2"]);
        let reasons = &expansion.units[0].metadata.verification_reasons;
        assert!(reasons.contains(&SURPLUS_SERIALS.to_string()));
        assert!(reasons.contains(&"malformed-nsn".to_string()));
        assert!(expansion.units[0].metadata.requires_verification);
    }
}

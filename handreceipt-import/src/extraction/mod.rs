//! Extraction result adapter
//!
//! Turns uncertain OCR/AI output into ordered `ParsedItem`s:
//! - lines sharing a group id merge into one item (text in line order,
//!   minimum child confidence)
//! - NSN, `QTY n` and serial numbers are recognised by pattern
//! - a serial is never synthesized; placeholders count as "no serial"
//! - lines with no name-like text are dropped and reported as notes
//!
//! Pre-parsed candidate items go through `from_candidates`, which applies
//! the same normalization without the text parsing.

pub mod fixture;
pub mod nsn;
pub mod serial_matcher;

pub use fixture::FixtureExtractor;
pub use serial_matcher::{is_placeholder, SerialMatch, SerialMatcher};

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;

use crate::models::{AdapterNote, CandidateItem, ParsedItem, RawLine, SerialSource};

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:QTY|QUANTITY)\b\s*[:=.]?\s*(-?\d+)").expect("static quantity regex")
});

/// Confidence multiplier for serials inferred from bare token shape
pub const AI_SERIAL_CONFIDENCE_FACTOR: f64 = 0.8;

/// Quantities above this are flagged unless configured otherwise
pub const DEFAULT_SUSPICIOUS_QUANTITY: u32 = 1000;

/// Review reasons raised by the adapter
pub mod review {
    pub const LOW_CONFIDENCE: &str = "low-confidence";
    pub const PLACEHOLDER_SERIAL: &str = "placeholder-serial-ignored";
    pub const QUANTITY_DEFAULTED: &str = "non-positive-quantity-defaulted";
    pub const QUANTITY_UNREADABLE: &str = "unreadable-quantity-defaulted";
    pub const SUSPICIOUS_QUANTITY: &str = "suspicious-quantity";
    pub const WEAPON_SERIAL_UNCONFIRMED: &str = "weapon-serial-unconfirmed";
}

/// Adapter output: items in input order plus non-blocking notes
#[derive(Debug, Clone, Default)]
pub struct AdapterOutput {
    pub items: Vec<ParsedItem>,
    pub notes: Vec<AdapterNote>,
}

#[derive(Debug, Clone)]
pub struct ExtractionAdapter {
    matcher: SerialMatcher,
    review_threshold: f64,
    suspicious_quantity: u32,
}

impl Default for ExtractionAdapter {
    fn default() -> Self {
        Self::new(0.7)
    }
}

/// Raw lines merged by group id
struct LineGroup {
    text: String,
    confidence: f64,
    line_indexes: Vec<usize>,
}

impl ExtractionAdapter {
    pub fn new(review_threshold: f64) -> Self {
        Self {
            matcher: SerialMatcher::default(),
            review_threshold: review_threshold.clamp(0.0, 1.0),
            suspicious_quantity: DEFAULT_SUSPICIOUS_QUANTITY,
        }
    }

    pub fn with_suspicious_quantity(mut self, threshold: u32) -> Self {
        self.suspicious_quantity = threshold.max(1);
        self
    }

    pub fn with_matcher(mut self, matcher: SerialMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn review_threshold(&self) -> f64 {
        self.review_threshold
    }

    /// Normalize raw extraction lines
    pub fn adapt(&self, lines: &[RawLine], form_reference: Option<&str>) -> AdapterOutput {
        let mut output = AdapterOutput::default();

        for group in group_lines(lines) {
            match self.parse_group(&group, output.items.len(), form_reference) {
                Some(item) => output.items.push(item),
                None => {
                    tracing::debug!(
                        lines = ?group.line_indexes,
                        text = %group.text,
                        "Dropping extraction line without item name"
                    );
                    output.notes.push(AdapterNote {
                        line_indexes: group.line_indexes,
                        text: group.text,
                        message: "no name-like text; line dropped".to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            lines = lines.len(),
            items = output.items.len(),
            dropped = output.notes.len(),
            "Adapted extraction lines"
        );
        output
    }

    /// Normalize candidates submitted already parsed
    pub fn from_candidates(
        &self,
        candidates: &[CandidateItem],
        form_reference: Option<&str>,
    ) -> Vec<ParsedItem> {
        candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let mut review_reasons = Vec::new();

                let nsn = candidate
                    .nsn
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(|n| nsn::normalize(n).unwrap_or_else(|| n.to_string()));

                let serial_number = candidate.serial_number.as_deref().and_then(|raw| {
                    let (kept, placeholder) = strip_placeholders(raw);
                    if placeholder {
                        review_reasons.push(review::PLACEHOLDER_SERIAL.to_string());
                    }
                    kept
                });

                let original_quantity = candidate.quantity.unwrap_or(1);
                let quantity = self.corrected_quantity(original_quantity, &mut review_reasons);

                let confidence = candidate.confidence.unwrap_or(1.0).clamp(0.0, 1.0);
                if confidence < self.review_threshold {
                    review_reasons.push(review::LOW_CONFIDENCE.to_string());
                }

                ParsedItem {
                    input_index: index,
                    nsn,
                    name: candidate.name.as_deref().unwrap_or_default().trim().to_string(),
                    serial_number,
                    quantity,
                    confidence,
                    serial_source: SerialSource::Explicit,
                    source_line_indexes: vec![index],
                    review_reasons,
                    form_reference: candidate
                        .form_reference
                        .clone()
                        .or_else(|| form_reference.map(str::to_string)),
                    original_quantity,
                }
            })
            .collect()
    }

    fn parse_group(
        &self,
        group: &LineGroup,
        input_index: usize,
        form_reference: Option<&str>,
    ) -> Option<ParsedItem> {
        let text = group.text.as_str();
        let mut excluded: Vec<Range<usize>> = Vec::new();
        let mut review_reasons = Vec::new();

        let nsn = nsn::find_in_text(text).map(|(span, value)| {
            excluded.push(span);
            value
        });

        let original_quantity = match QUANTITY.captures(text) {
            Some(caps) => {
                if let Some(whole) = caps.get(0) {
                    excluded.push(whole.range());
                }
                match caps.get(1).map(|m| m.as_str().parse::<i64>()) {
                    Some(Ok(quantity)) => quantity,
                    _ => {
                        review_reasons.push(review::QUANTITY_UNREADABLE.to_string());
                        1
                    }
                }
            }
            None => 1,
        };

        let scan = self.matcher.scan(text, &excluded);
        excluded.extend(scan.consumed.iter().cloned());

        let name = residual_text(text, &excluded);
        if name.chars().filter(|c| c.is_alphabetic()).count() < 2 {
            return None;
        }

        if scan.placeholder_found {
            review_reasons.push(review::PLACEHOLDER_SERIAL.to_string());
        }

        let quantity = self.corrected_quantity(original_quantity, &mut review_reasons);

        let labelled = scan.matches.iter().any(|m| m.labelled);
        let (serial_source, confidence) = if scan.matches.is_empty() || labelled {
            (SerialSource::Explicit, group.confidence)
        } else {
            (
                SerialSource::AiExtracted,
                group.confidence * AI_SERIAL_CONFIDENCE_FACTOR,
            )
        };

        if !scan.matches.is_empty() && confidence < self.review_threshold {
            review_reasons.push(review::LOW_CONFIDENCE.to_string());
        }
        if serial_source == SerialSource::AiExtracted
            && nsn.as_deref().is_some_and(nsn::is_weapon)
        {
            review_reasons.push(review::WEAPON_SERIAL_UNCONFIRMED.to_string());
        }

        let serial_number = if scan.matches.is_empty() {
            None
        } else {
            Some(
                scan.matches
                    .iter()
                    .map(|m| m.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        };

        Some(ParsedItem {
            input_index,
            nsn,
            name,
            serial_number,
            quantity,
            confidence,
            serial_source,
            source_line_indexes: group.line_indexes.clone(),
            review_reasons,
            form_reference: form_reference.map(str::to_string),
            original_quantity,
        })
    }

    /// Quantities below 1 are read errors and become 1; very large ones are
    /// kept (the batch size limit applies after expansion) but flagged
    fn corrected_quantity(&self, original: i64, review_reasons: &mut Vec<String>) -> u32 {
        if original < 1 {
            review_reasons.push(review::QUANTITY_DEFAULTED.to_string());
            return 1;
        }

        let quantity = u32::try_from(original).unwrap_or(u32::MAX);
        if quantity > self.suspicious_quantity {
            review_reasons.push(review::SUSPICIOUS_QUANTITY.to_string());
        }
        quantity
    }
}

/// Merge lines by group id, ordered by each group's first line
fn group_lines(lines: &[RawLine]) -> Vec<LineGroup> {
    let mut groups: Vec<LineGroup> = Vec::new();
    let mut by_id: HashMap<&str, usize> = HashMap::new();

    for (index, line) in lines.iter().enumerate() {
        let confidence = line.confidence.clamp(0.0, 1.0);
        let existing = line.group_id.as_deref().and_then(|id| by_id.get(id).copied());

        match existing {
            Some(slot) => {
                let group = &mut groups[slot];
                group.text.push(' ');
                group.text.push_str(line.text.trim());
                group.confidence = group.confidence.min(confidence);
                group.line_indexes.push(index);
            }
            None => {
                if let Some(id) = line.group_id.as_deref() {
                    by_id.insert(id, groups.len());
                }
                groups.push(LineGroup {
                    text: line.text.trim().to_string(),
                    confidence,
                    line_indexes: vec![index],
                });
            }
        }
    }

    groups
}

/// Text left after removing recognised spans, whitespace collapsed
fn residual_text(text: &str, excluded: &[Range<usize>]) -> String {
    let mut kept = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if excluded.iter().any(|r| r.contains(&i)) {
            kept.push(' ');
        } else {
            kept.push(c);
        }
    }

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '-' | '.'))
        .trim()
        .to_string()
}

/// Drop placeholder entries from a serial list; `None` if nothing real remains
fn strip_placeholders(raw: &str) -> (Option<String>, bool) {
    let mut placeholder = false;
    let kept: Vec<&str> = raw
        .split([',', ';', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| {
            let is_ph = is_placeholder(s);
            placeholder |= is_ph;
            !is_ph
        })
        .collect();

    if kept.is_empty() {
        (None, placeholder)
    } else {
        (Some(kept.join(", ")), placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> ExtractionAdapter {
        ExtractionAdapter::new(0.7)
    }

    #[test]
    fn test_adapt_parses_nsn_quantity_and_labelled_serial() {
        let lines = vec![RawLine::new(
            "1005-01-231-0973 CARBINE 5.56MM M4 S/N: W123456 QTY 1",
            0.93,
        )];

        let output = adapter().adapt(&lines, Some("2062-0042"));
        assert!(output.notes.is_empty());
        let item = &output.items[0];
        assert_eq!(item.nsn.as_deref(), Some("1005-01-231-0973"));
        assert_eq!(item.name, "CARBINE 5.56MM M4");
        assert_eq!(item.serial_number.as_deref(), Some("W123456"));
        assert_eq!(item.quantity, 1);
        assert_eq!(item.serial_source, SerialSource::Explicit);
        assert!((item.confidence - 0.93).abs() < 1e-9);
        assert!(item.review_reasons.is_empty());
        assert_eq!(item.form_reference.as_deref(), Some("2062-0042"));
    }

    #[test]
    fn test_grouped_lines_merge_with_min_confidence() {
        let lines = vec![
            RawLine::new("NIGHT VISION GOGGLE", 0.9).grouped("g1"),
            RawLine::new("COMPASS LENSATIC S/N C55123", 0.95),
            RawLine::new("AN/PVS-14 S/N: 55012", 0.75).grouped("g1"),
        ];

        let output = adapter().adapt(&lines, None);
        assert_eq!(output.items.len(), 2);

        let goggle = &output.items[0];
        assert_eq!(goggle.name, "NIGHT VISION GOGGLE AN/PVS-14");
        assert_eq!(goggle.serial_number.as_deref(), Some("55012"));
        assert_eq!(goggle.source_line_indexes, vec![0, 2]);
        assert!((goggle.confidence - 0.75).abs() < 1e-9);

        assert_eq!(output.items[1].input_index, 1);
        assert_eq!(output.items[1].source_line_indexes, vec![1]);
    }

    #[test]
    fn test_bare_serial_is_ai_extracted_with_reduced_confidence() {
        let lines = vec![RawLine::new("BINOCULAR M22 1234ABCD", 0.8)];
        let item = &adapter().adapt(&lines, None).items[0];

        assert_eq!(item.serial_source, SerialSource::AiExtracted);
        assert_eq!(item.serial_number.as_deref(), Some("1234ABCD"));
        assert!((item.confidence - 0.64).abs() < 1e-9);
        assert!(item.review_reasons.contains(&review::LOW_CONFIDENCE.to_string()));
    }

    #[test]
    fn test_weapon_with_inferred_serial_is_flagged() {
        let lines = vec![RawLine::new("NSN 1005012310973 CARBINE M4 W123456", 0.99)];
        let item = &adapter().adapt(&lines, None).items[0];
        assert_eq!(item.serial_source, SerialSource::AiExtracted);
        assert!(item
            .review_reasons
            .contains(&review::WEAPON_SERIAL_UNCONFIRMED.to_string()));
    }

    #[test]
    fn test_no_serial_is_not_synthesized() {
        let lines = vec![
            RawLine::new("TARP CANVAS OD QTY 2", 0.9),
            RawLine::new("COMPASS S/N: NOSERIAL", 0.9),
        ];
        let output = adapter().adapt(&lines, None);

        assert_eq!(output.items[0].serial_number, None);
        assert_eq!(output.items[0].quantity, 2);
        assert_eq!(output.items[1].serial_number, None);
        assert!(output.items[1]
            .review_reasons
            .contains(&review::PLACEHOLDER_SERIAL.to_string()));
    }

    #[test]
    fn test_lines_without_name_become_notes() {
        let lines = vec![
            RawLine::new("12 34", 0.4),
            RawLine::new("MASK PROTECTIVE M50 S/N 8812345", 0.9),
        ];
        let output = adapter().adapt(&lines, None);

        assert_eq!(output.items.len(), 1);
        assert_eq!(output.items[0].input_index, 0);
        assert_eq!(output.notes.len(), 1);
        assert_eq!(output.notes[0].line_indexes, vec![0]);
    }

    #[test]
    fn test_non_positive_quantity_defaults_to_one() {
        let lines = vec![RawLine::new("RADIO SET S/N R100200 QTY 0", 0.9)];
        let item = &adapter().adapt(&lines, None).items[0];
        assert_eq!(item.quantity, 1);
        assert_eq!(item.original_quantity, 0);
        assert!(item.review_reasons.contains(&review::QUANTITY_DEFAULTED.to_string()));
    }

    #[test]
    fn test_unreadable_quantity_is_flagged() {
        let lines = vec![RawLine::new("RADIO SET S/N R100200 QTY 99999999999999999999", 0.9)];
        let item = &adapter().adapt(&lines, None).items[0];
        assert_eq!(item.quantity, 1);
        assert!(item.review_reasons.contains(&review::QUANTITY_UNREADABLE.to_string()));
    }

    #[test]
    fn test_large_quantity_is_suspicious() {
        let adapter = adapter().with_suspicious_quantity(50);
        let lines = vec![
            RawLine::new("COMPASS LENSATIC S/N C55123 QTY 51", 0.95),
            RawLine::new("COMPASS LENSATIC S/N C55124 QTY 50", 0.95),
        ];
        let items = adapter.adapt(&lines, None).items;
        assert!(items[0].review_reasons.contains(&review::SUSPICIOUS_QUANTITY.to_string()));
        assert!(items[1].review_reasons.is_empty());

        let huge = vec![CandidateItem {
            name: Some("BAYONET".into()),
            serial_number: Some("B1".into()),
            quantity: Some(i64::MAX),
            ..Default::default()
        }];
        let items = adapter.from_candidates(&huge, None);
        assert_eq!(items[0].quantity, u32::MAX);
        assert_eq!(items[0].original_quantity, i64::MAX);
        assert!(items[0].review_reasons.contains(&review::SUSPICIOUS_QUANTITY.to_string()));
    }

    #[test]
    fn test_from_candidates_normalizes_fields() {
        let candidates = vec![
            CandidateItem {
                nsn: Some("5855015345931".into()),
                name: Some("  GOGGLE NV  ".into()),
                serial_number: Some("A1, TEMP, A2".into()),
                quantity: Some(-2),
                confidence: Some(0.5),
                form_reference: None,
            },
            CandidateItem {
                nsn: Some("58-55".into()),
                name: Some("STRAP".into()),
                serial_number: Some("N/A".into()),
                ..Default::default()
            },
        ];

        let items = adapter().from_candidates(&candidates, Some("2062-7"));

        assert_eq!(items[0].nsn.as_deref(), Some("5855-01-534-5931"));
        assert_eq!(items[0].name, "GOGGLE NV");
        assert_eq!(items[0].serial_number.as_deref(), Some("A1, A2"));
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].original_quantity, -2);
        assert_eq!(items[0].form_reference.as_deref(), Some("2062-7"));
        for reason in [
            review::PLACEHOLDER_SERIAL,
            review::QUANTITY_DEFAULTED,
            review::LOW_CONFIDENCE,
        ] {
            assert!(items[0].review_reasons.contains(&reason.to_string()));
        }

        // Malformed NSN is passed through for the validator to flag
        assert_eq!(items[1].nsn.as_deref(), Some("58-55"));
        assert_eq!(items[1].serial_number, None);
        assert_eq!(items[1].quantity, 1);
        assert!((items[1].confidence - 1.0).abs() < 1e-9);
    }
}

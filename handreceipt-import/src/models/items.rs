//! Line items at each stage of reconciliation
//!
//! RawLine (OCR output) → ParsedItem (adapter) → ValidatedUnit (one per
//! physical unit, ready to commit). Each stage is immutable once built.

use serde::{Deserialize, Serialize};

/// Page-relative position of an OCR line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePosition {
    pub page: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One line of OCR/AI extraction output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLine {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<LinePosition>,
    /// Per-line extraction confidence in [0, 1]
    pub confidence: f64,
    /// Lines sharing a group id belong to one item (wrapped descriptions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl RawLine {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            position: None,
            confidence,
            group_id: None,
        }
    }

    pub fn grouped(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// Pre-parsed candidate as submitted by a client that did its own extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateItem {
    #[serde(default)]
    pub nsn: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub form_reference: Option<String>,
}

/// How a serial number reached the item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerialSource {
    /// Printed with a serial label (S/N, SN, SERIAL) or typed by a person
    Explicit,
    /// Inferred from a bare token shape by the extraction step
    AiExtracted,
}

impl SerialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SerialSource::Explicit => "explicit",
            SerialSource::AiExtracted => "ai_extracted",
        }
    }
}

/// Where a batch's items came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSource {
    /// Raw OCR/AI extraction lines run through the adapter
    Da2062Scan,
    /// Candidate items submitted already parsed
    Da2062Candidates,
}

impl ImportSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSource::Da2062Scan => "da2062_scan",
            ImportSource::Da2062Candidates => "da2062_candidates",
        }
    }
}

/// Candidate line item produced by the extraction adapter
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    /// Position in the adapter output; outcome `inputIndex` refers to this
    pub input_index: usize,
    pub nsn: Option<String>,
    pub name: String,
    /// May hold several serials separated by `,` `;` or newlines
    pub serial_number: Option<String>,
    pub quantity: u32,
    pub confidence: f64,
    pub serial_source: SerialSource,
    /// Raw line (or candidate) indexes this item was built from, in order
    pub source_line_indexes: Vec<usize>,
    /// Reasons raised by the adapter that require a human check
    pub review_reasons: Vec<String>,
    pub form_reference: Option<String>,
    /// Quantity as read, before correction of non-positive values
    pub original_quantity: i64,
}

/// Import provenance attached to every created property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMetadata {
    pub source: ImportSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_reference: Option<String>,
    pub confidence: f64,
    pub serial_source: SerialSource,
    pub requires_verification: bool,
    #[serde(default)]
    pub verification_reasons: Vec<String>,
    pub original_quantity: i64,
    /// Zero-based position of this unit within its line's quantity
    pub quantity_index: u32,
    /// Reserved for free-form metadata; never interpreted by the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<serde_json::Value>,
}

/// One physical unit ready for an atomic create
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUnit {
    pub input_index: usize,
    pub unit_index: u32,
    pub name: String,
    /// Trimmed, never empty
    pub serial_number: String,
    pub nsn: Option<String>,
    pub metadata: ImportMetadata,
}

impl ValidatedUnit {
    /// Ordering key used to reassemble results after concurrent commit
    pub fn position(&self) -> (usize, u32) {
        (self.input_index, self.unit_index)
    }
}

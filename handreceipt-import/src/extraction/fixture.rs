//! Fixture extraction backend
//!
//! Stands in for the OCR/AI service in tests and local runs. Either replays a
//! fixed set of lines or treats the document as UTF-8 text, one raw line per
//! non-blank text line.

use crate::models::RawLine;
use crate::types::{ExtractionError, Extractor};

#[derive(Debug, Clone)]
enum Mode {
    Replay(Vec<RawLine>),
    PlainText { confidence: f64 },
    Failing(String),
}

#[derive(Debug, Clone)]
pub struct FixtureExtractor {
    mode: Mode,
}

impl FixtureExtractor {
    /// Always return `lines`, ignoring the document
    pub fn with_lines(lines: Vec<RawLine>) -> Self {
        Self {
            mode: Mode::Replay(lines),
        }
    }

    /// Split the document into lines, each with the given confidence
    pub fn plain_text(confidence: f64) -> Self {
        Self {
            mode: Mode::PlainText {
                confidence: confidence.clamp(0.0, 1.0),
            },
        }
    }

    /// Always fail with a service error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            mode: Mode::Failing(message.into()),
        }
    }
}

#[async_trait::async_trait]
impl Extractor for FixtureExtractor {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn extract(&self, document: &[u8]) -> Result<Vec<RawLine>, ExtractionError> {
        match &self.mode {
            Mode::Replay(lines) => Ok(lines.clone()),
            Mode::PlainText { confidence } => {
                let text = std::str::from_utf8(document)
                    .map_err(|e| ExtractionError::Unreadable(e.to_string()))?;
                Ok(text
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(|l| RawLine::new(l, *confidence))
                    .collect())
            }
            Mode::Failing(message) => Err(ExtractionError::Service(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_splits_lines() {
        let extractor = FixtureExtractor::plain_text(0.9);
        let lines = extractor
            .extract(b"CARBINE M4 S/N W1\n\n  COMPASS S/N C2  \n")
            .await
            .unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "COMPASS S/N C2");
        assert!((lines[0].confidence - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_plain_text_rejects_binary() {
        let extractor = FixtureExtractor::plain_text(0.9);
        let err = extractor.extract(&[0xff, 0xfe, 0x00]).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable(_)));
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let err = FixtureExtractor::failing("model offline")
            .extract(b"")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model offline"));
    }
}

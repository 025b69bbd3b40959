//! Bounded serial number recognition
//!
//! Two token shapes are recognised:
//! - labelled: tokens following `S/N`, `SN`, `SER`, `SERIAL [NO|NUMBER]`
//! - bare: a 6-12 character uppercase alphanumeric run containing a digit
//!
//! Labelled serials win; bare tokens are only collected when the text has no
//! labelled serial. At most `max_tokens` tokens are examined per text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static SERIAL_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:S\s*/\s*N|SER(?:IAL)?(?:\s*(?:NO|NUM(?:BER)?))?|SN)\b\.?\s*[:#]?")
        .expect("static serial label regex")
});

/// Default token budget per item text
pub const DEFAULT_MAX_TOKENS: usize = 64;

const STOP_WORDS: &[&str] = &["QTY", "QUANTITY", "NSN", "NIIN", "LIN", "EA", "UI", "UNIT"];

const PLACEHOLDER_WORDS: &[&str] = &["N/A", "NA", "NONE", "UNK", "UNKNOWN", "TBD", "NO"];

const PLACEHOLDER_MARKERS: &[&str] = &["NOSERIAL", "TEMP", "PLACEHOLDER"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialMatch {
    pub value: String,
    /// Preceded by a serial label
    pub labelled: bool,
    pub span: Range<usize>,
}

/// Result of scanning one item's text
#[derive(Debug, Clone, Default)]
pub struct SerialScan {
    pub matches: Vec<SerialMatch>,
    /// A serial label was followed by a placeholder (`N/A`, `NOSERIAL`, ...)
    pub placeholder_found: bool,
    /// Byte ranges holding labels, serials or placeholders
    pub consumed: Vec<Range<usize>>,
}

/// `NOSERIAL`, `TEMP-001`, `N/A`, `NO SERIAL` and similar stand-ins
pub fn is_placeholder(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    if compact.is_empty() {
        return false;
    }
    PLACEHOLDER_WORDS.contains(&compact.as_str())
        || PLACEHOLDER_MARKERS.iter().any(|m| compact.contains(m))
}

#[derive(Debug, Clone)]
pub struct SerialMatcher {
    max_tokens: usize,
}

impl Default for SerialMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

impl SerialMatcher {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens: max_tokens.max(1),
        }
    }

    pub fn find(&self, text: &str) -> Vec<SerialMatch> {
        self.scan(text, &[]).matches
    }

    /// Scan `text`, ignoring tokens that overlap `excluded` byte ranges
    pub fn scan(&self, text: &str, excluded: &[Range<usize>]) -> SerialScan {
        let mut scan = SerialScan::default();
        let mut budget = self.max_tokens;

        let mut search_from = 0;
        while budget > 0 {
            let Some(label) = SERIAL_LABEL.find_at(text, search_from) else {
                break;
            };
            if overlaps(&label.range(), excluded) {
                search_from = label.end();
                continue;
            }

            let mut span = label.range();
            let mut placeholder_here = false;
            for (range, token) in tokens(text, label.end()) {
                if budget == 0 {
                    break;
                }
                budget -= 1;

                if overlaps(&range, excluded) || is_stop_word(token) {
                    break;
                }

                if is_placeholder(token) || (placeholder_here && is_placeholder_tail(token)) {
                    placeholder_here = true;
                    span.end = range.end;
                    continue;
                }
                if !is_labelled_shape(token) {
                    break;
                }

                span.end = range.end;
                push_distinct(
                    &mut scan.matches,
                    SerialMatch {
                        value: token.to_string(),
                        labelled: true,
                        span: range,
                    },
                );
            }

            scan.placeholder_found |= placeholder_here;
            search_from = span.end.max(label.end());
            scan.consumed.push(span);
        }

        if scan.matches.is_empty() {
            let mut skip: Vec<Range<usize>> = excluded.to_vec();
            skip.extend(scan.consumed.iter().cloned());

            for (range, token) in tokens(text, 0) {
                if budget == 0 {
                    break;
                }
                budget -= 1;

                if overlaps(&range, &skip) || !is_bare_shape(token) {
                    continue;
                }
                scan.consumed.push(range.clone());
                push_distinct(
                    &mut scan.matches,
                    SerialMatch {
                        value: token.to_string(),
                        labelled: false,
                        span: range,
                    },
                );
            }
        }

        scan
    }
}

/// Tokens separated by whitespace, `,` or `;`, trimmed of surrounding punctuation
fn tokens(text: &str, from: usize) -> impl Iterator<Item = (Range<usize>, &str)> {
    let tail = &text[from..];
    let mut out = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in tail.char_indices() {
        let separator = c.is_whitespace() || c == ',' || c == ';';
        match (separator, start) {
            (true, Some(s)) => {
                out.push(s..i);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(s..tail.len());
    }

    out.into_iter().filter_map(move |r| {
        let raw = &tail[r.clone()];
        let trimmed_start = raw.len() - raw.trim_start_matches(is_edge_punct).len();
        let token = raw.trim_matches(is_edge_punct);
        if token.is_empty() {
            return None;
        }
        let abs_start = from + r.start + trimmed_start;
        Some((abs_start..abs_start + token.len(), token))
    })
}

fn is_edge_punct(c: char) -> bool {
    matches!(c, '.' | ':' | '#' | '(' | ')' | '[' | ']' | '"' | '\'')
}

fn overlaps(range: &Range<usize>, others: &[Range<usize>]) -> bool {
    others
        .iter()
        .any(|o| range.start < o.end && o.start < range.end)
}

fn is_stop_word(token: &str) -> bool {
    let upper = token.to_uppercase();
    STOP_WORDS.contains(&upper.as_str())
}

fn is_placeholder_tail(token: &str) -> bool {
    matches!(token.to_uppercase().as_str(), "SERIAL" | "NUMBER" | "SN")
}

/// Labelled serials may contain `-` and `/`; must carry a digit
fn is_labelled_shape(token: &str) -> bool {
    let len = token.chars().count();
    (3..=20).contains(&len)
        && token.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/')
        && token.chars().any(|c| c.is_ascii_digit())
}

/// Bare serial candidates: 6-12 uppercase letters/digits with at least one digit
fn is_bare_shape(token: &str) -> bool {
    (6..=12).contains(&token.len())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        && token.chars().any(|c| c.is_ascii_digit())
}

fn push_distinct(matches: &mut Vec<SerialMatch>, candidate: SerialMatch) {
    if !matches.iter().any(|m| m.value == candidate.value) {
        matches.push(candidate);
    }
}

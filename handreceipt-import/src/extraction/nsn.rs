//! National Stock Number helpers
//!
//! An NSN is 13 digits, written `FSC-CC-NNN-NNNN` (4-2-3-4). The first four
//! digits are the Federal Supply Class; the last nine are the NIIN.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static NSN_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-?\d{2}-?\d{3}-?\d{4}$").expect("static NSN regex"));

static NSN_LOOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}[-\s]?\d{2}[-\s]?\d{3}[-\s]?\d{4}$").expect("static NSN regex")
});

static NSN_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bNSN[\s:#]*)?\b(\d{4}-?\d{2}-?\d{3}-?\d{4})\b").expect("static NSN regex")
});

/// FSC for small arms (weapons through 30mm)
const WEAPON_FSC: &str = "1005";

/// Canonical hyphenated form, or `None` if `raw` is not a 13-digit NSN
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !NSN_LOOSE.is_match(trimmed) {
        return None;
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 13 {
        return None;
    }

    Some(format!(
        "{}-{}-{}-{}",
        &digits[0..4],
        &digits[4..6],
        &digits[6..9],
        &digits[9..13]
    ))
}

/// Accepts `####-##-###-####` with or without hyphens
pub fn is_valid_format(nsn: &str) -> bool {
    NSN_FORMAT.is_match(nsn.trim())
}

pub fn fsc(nsn: &str) -> Option<String> {
    normalize(nsn).map(|n| n[0..4].to_string())
}

pub fn niin(nsn: &str) -> Option<String> {
    normalize(nsn).map(|n| n[5..].replace('-', ""))
}

/// Small arms carry sensitive-item accountability
pub fn is_weapon(nsn: &str) -> bool {
    fsc(nsn).as_deref() == Some(WEAPON_FSC)
}

/// First NSN in free text: (byte span including any `NSN` label, normalized NSN)
pub fn find_in_text(text: &str) -> Option<(Range<usize>, String)> {
    let caps = NSN_IN_TEXT.captures(text)?;
    let whole = caps.get(0)?;
    let value = normalize(caps.get(1)?.as_str())?;
    Some((whole.range(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_variants() {
        assert_eq!(normalize("1005-01-231-0973").as_deref(), Some("1005-01-231-0973"));
        assert_eq!(normalize("1005012310973").as_deref(), Some("1005-01-231-0973"));
        assert_eq!(normalize(" 1005 01 231 0973 ").as_deref(), Some("1005-01-231-0973"));
        assert_eq!(normalize("1005-01-231-097"), None);
        assert_eq!(normalize("ABCD-01-231-0973"), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn test_format_and_parts() {
        assert!(is_valid_format("5855-01-534-5931"));
        assert!(is_valid_format("5855015345931"));
        assert!(!is_valid_format("5855-1-534-5931"));
        assert_eq!(fsc("5855015345931").as_deref(), Some("5855"));
        assert_eq!(niin("5855-01-534-5931").as_deref(), Some("015345931"));
    }

    #[test]
    fn test_weapon_fsc() {
        assert!(is_weapon("1005-01-231-0973"));
        assert!(!is_weapon("5855-01-534-5931"));
        assert!(!is_weapon("garbage"));
    }

    #[test]
    fn test_find_in_text_includes_label() {
        let text = "NSN: 1005012310973 CARBINE 5.56MM M4";
        let (span, nsn) = find_in_text(text).unwrap();
        assert_eq!(nsn, "1005-01-231-0973");
        assert_eq!(&text[span], "NSN: 1005012310973");
        assert!(find_in_text("CARBINE M4").is_none());
    }
}

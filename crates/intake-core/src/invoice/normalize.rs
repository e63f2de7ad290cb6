//! Text normalization shared by extraction and duplicate detection.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Replacement for characters from custom, non-Unicode-mapped font glyphs.
pub const PLACEHOLDER: char = 'X';

/// Currency glyphs and thousands separators ignored in amounts.
pub const CURRENCY_GLYPHS: &[&str] = &[",", "，", "¥", "￥", "円"];

/// Collapse every whitespace run, newlines included, to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

/// Remove currency glyphs and thousands separators.
pub fn strip_currency(text: &str) -> String {
    CURRENCY_GLYPHS
        .iter()
        .fold(text.to_string(), |acc, glyph| acc.replace(glyph, ""))
}

/// Whether `c` is in a Unicode Private Use Area.
pub fn is_private_use(c: char) -> bool {
    matches!(c, '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}')
}

/// Replace each Private Use Area character with [`PLACEHOLDER`].
pub fn replace_private_use(text: &str) -> String {
    text.chars()
        .map(|c| if is_private_use(c) { PLACEHOLDER } else { c })
        .collect()
}

/// Comparison key for duplicate detection.
///
/// Currency glyphs go first so `"¥ 50,000"` and `"50,000"` compare equal.
pub fn normalize_key(value: &str) -> String {
    collapse_whitespace(strip_currency(value).trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a \n\t b\r\nc"), "a b c");
    }

    #[test]
    fn test_replace_private_use_keeps_length() {
        let text = "株式会社\u{E001}\u{F8FF}商事\u{F0001}";
        let replaced = replace_private_use(text);
        assert_eq!(replaced, "株式会社XX商事X");
        assert_eq!(replaced.chars().count(), text.chars().count());
        assert!(!replaced.chars().any(is_private_use));
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  ¥50,000 "), "50000");
        assert_eq!(normalize_key("50,000円"), "50000");
        assert_eq!(normalize_key("¥ 50，000"), "50000");
        assert_eq!(normalize_key(" Acme   Co\n"), "Acme Co");
        assert_eq!(normalize_key("   "), "");
    }
}

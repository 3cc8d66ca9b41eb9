//! Regular expressions shared by the line feature extractors.
//!
//! All patterns are meant to be used with `find` on the beginning of a line
//! and are anchored with `^` where the match must start at the first character.

use once_cell::sync::Lazy;
use regex::Regex;

/// Numbered list marker: `3. `, `1.2.3 `, `\t12`, `12.34.56`, `4.2)`.
pub static REGEXPS_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\s*(\d+\.)+(\d+)?\S?\s|\s+\d+\S?\s?|\s*(\d+\.)+\d+|\s*(\d+\.)*\d+[)}])")
        .expect("valid number regex")
});

/// Trailing letter (or nothing) after a list number.
pub static REGEXPS_ENDS_OF_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Zа-яА-ЯёЁ]?\s*$").expect("valid number end regex"));

pub static REGEXPS_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(19\d\d|20\d\d)").expect("valid year regex"));

/// `1. ` style item.
pub static REGEXPS_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\.\s").expect("valid item regex"));

/// `1)`, `4.2.3)` or `1}` style item.
pub static REGEXPS_ITEM_WITH_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d*\.)*\d+[)}]").expect("valid bracket item regex"));

/// Latin or cyrillic letter followed by a bracket.
pub static REGEXPS_SUBITEM_EXTENDED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[a-zA-Zа-яА-ЯёЁ][)}]").expect("valid extended subitem regex"));

/// Lowercase cyrillic letter followed by `)`.
pub static REGEXPS_SUBITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[а-яё]\)").expect("valid subitem regex"));

pub static ROMAN_NUMERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[IVX]+").expect("valid roman numeral regex"));

/// Single bullet-like symbol at the start of a line.
pub static BULLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*[-—−–®.•,‚©⎯°*>●♣①➢◦+?#○■□▪▫\u{f0b7}\u{f0a7}\u{f076}\u{f0d8}\u{f0fc}]",
    )
    .expect("valid bullet regex")
});

/// `раздел` / `подраздел` headings.
pub static NAMED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(под)?раздел\s*").expect("valid named item regex"));

/// Number at the very end of a line, e.g. a page number in a table of contents.
pub static TRAILING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+$").expect("valid trailing number regex"));

/// Whole-string check, the equivalent of a full match.
pub fn full_match(regex: &Regex, text: &str) -> bool {
    regex
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

use regex::Regex;

use crate::{
    features::patterns::{REGEXPS_ENDS_OF_NUMBER, REGEXPS_NUMBER},
    layout::element::Line,
};

/// Match length of every pattern at the start of the stripped line, plus the
/// number of patterns that matched.
///
/// Features are named `start_regexp_<i>` and `start_regexp_num_matches`, with
/// `_<suffix>` appended when a suffix is given.
///
/// # Example
/// ```
/// use regex::Regex;
/// use dedoc_core::features::regexp::start_regexp_features;
/// let patterns = vec![Regex::new(r"^\d+\.").unwrap(), Regex::new(r"^[a-z]\)").unwrap()];
/// let features = start_regexp_features("  12. Scope", &patterns, None);
/// assert_eq!(features[0], ("start_regexp_0".to_string(), 3.0));
/// assert_eq!(features[1], ("start_regexp_1".to_string(), 0.0));
/// assert_eq!(features[2], ("start_regexp_num_matches".to_string(), 1.0));
/// ```
pub fn start_regexp_features(
    text: &str,
    patterns: &[Regex],
    suffix: Option<&str>,
) -> Vec<(String, f64)> {
    let text = text.trim();
    let name = |base: String| match suffix {
        Some(suffix) => format!("{}_{}", base, suffix),
        None => base,
    };

    let mut matches = 0usize;
    let mut features = Vec::with_capacity(patterns.len() + 1);
    for (i, pattern) in patterns.iter().enumerate() {
        let length = pattern
            .find(text)
            .filter(|m| m.start() == 0 && m.end() > 0)
            .map(|m| text[..m.end()].chars().count())
            .unwrap_or(0);
        if length > 0 {
            matches += 1;
        }
        features.push((name(format!("start_regexp_{}", i)), length as f64));
    }
    features.push((name("start_regexp_num_matches".to_string()), matches as f64));
    features
}

/// Whether any of `patterns` occurs in the lowercased stripped line, per
/// pattern, followed by the number of patterns found.
pub fn end_regexp_features(text: &str, patterns: &[Regex]) -> Vec<f64> {
    let text = text.trim().to_lowercase();
    let found = patterns
        .iter()
        .map(|pattern| if pattern.is_match(&text) { 1.0 } else { 0.0 })
        .collect::<Vec<f64>>();
    let total = found.iter().sum();

    let mut features = found;
    features.push(total);
    features
}

/// Checks whether list number `prev` may directly precede list number `this`.
///
/// Numbers are dotted (`2.1.3`); empty parts are ignored. `1` opens a list
/// without a predecessor, `X.1` opens a new depth under `X`, and on the same
/// depth the last part must grow by exactly one.
///
/// # Example
/// ```
/// use dedoc_core::features::regexp::can_be_prev_element;
/// assert!(can_be_prev_element(Some("1"), None));
/// assert!(can_be_prev_element(Some("2.1.2"), Some("2.1.1")));
/// assert!(can_be_prev_element(Some("2.1"), Some("2")));
/// assert!(!can_be_prev_element(Some("2.1.2"), Some("2.1.")));
/// assert!(!can_be_prev_element(Some("3."), Some("5.")));
/// ```
pub fn can_be_prev_element(this: Option<&str>, prev: Option<&str>) -> bool {
    let Some(this) = this else {
        return false;
    };
    let this_parts = split_number(this);
    if this_parts == ["1"] {
        return true;
    }
    let Some(prev) = prev else {
        return false;
    };
    let prev_parts = split_number(prev);

    if prev_parts.len() > this_parts.len() || prev_parts.len() + 1 < this_parts.len() {
        return false;
    }
    let Some((this_last, this_prefix)) = this_parts.split_last() else {
        return false;
    };

    if prev_parts.len() + 1 == this_parts.len() {
        return prev_parts.as_slice() == this_prefix && *this_last == "1";
    }

    let Some((prev_last, prev_prefix)) = prev_parts.split_last() else {
        return false;
    };
    if prev_prefix != this_prefix {
        return false;
    }
    match (this_last.parse::<i64>(), prev_last.parse::<i64>()) {
        (Ok(this_last), Ok(prev_last)) => this_last - prev_last == 1,
        _ => false,
    }
}

fn split_number(number: &str) -> Vec<&str> {
    number.split('.').filter(|part| !part.is_empty()).collect()
}

/// Extracts the list number of a line, or `None` if the line is not a numbered item.
///
/// A trailing letter, `)`, `}` or `.` after the number is dropped.
pub fn list_number(text: &str, item: &Regex, end: &Regex) -> Option<String> {
    let text = text.trim();
    let found = item.find(text).filter(|m| m.start() == 0)?;
    let mut number = found.as_str().trim();

    if let Some(cut) = end.find(number) {
        number = &number[..cut.start()];
    }
    let number = number
        .strip_suffix([')', '}', '.'])
        .unwrap_or(number);
    Some(number.to_string())
}

/// List continuity indicator per line.
///
/// Numbered lines get `1` when the previous numbered line is a valid
/// predecessor and `-1` otherwise; other lines get `0`.
pub fn list_features(lines: &[Line], item: &Regex, end: &Regex) -> Vec<f64> {
    let numbers = lines
        .iter()
        .enumerate()
        .filter_map(|(line_id, line)| {
            list_number(&line.text, item, end).map(|number| (line_id, number))
        })
        .collect::<Vec<_>>();

    let mut result = vec![0.0; lines.len()];
    for (i, (line_id, number)) in numbers.iter().enumerate() {
        let prev = i
            .checked_sub(1)
            .and_then(|prev_id| numbers.get(prev_id))
            .map(|(_, prev)| prev.as_str());
        result[*line_id] = if can_be_prev_element(Some(number), prev) {
            1.0
        } else {
            -1.0
        };
    }
    result
}

/// [`list_features`] with the default numbering patterns.
pub fn numbered_list_features(lines: &[Line]) -> Vec<f64> {
    list_features(lines, &REGEXPS_NUMBER, &REGEXPS_ENDS_OF_NUMBER)
}

/// Signed distance (in lines) of every line to the first line `is_special`
/// accepts; all zeros when there is no such line.
pub fn before_special_line(lines: &[Line], is_special: impl Fn(&Line) -> bool) -> Vec<f64> {
    match lines.iter().position(is_special) {
        Some(special_id) => (0..lines.len())
            .map(|line_id| line_id as f64 - special_id as f64)
            .collect(),
        None => vec![0.0; lines.len()],
    }
}

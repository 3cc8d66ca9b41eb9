//! Per-line style features read from annotations.

use serde::Deserialize;

use crate::layout::element::{Annotation, Line};

fn is_true(annotation: &Annotation) -> bool {
    annotation.value == "True"
}

fn first_value<T: std::str::FromStr>(line: &Line, name: &str) -> Option<T> {
    line.annotations_named(name)
        .next()
        .and_then(|annotation| annotation.value.trim().parse().ok())
}

/// 1 if any part of the line is bold.
pub fn bold(line: &Line) -> f64 {
    if line.annotations_named(Annotation::BOLD).any(is_true) {
        1.0
    } else {
        0.0
    }
}

/// Share of bold characters in the line.
///
/// # Example
/// ```
/// use dedoc_core::features::typography::bold_percent;
/// use dedoc_core::layout::element::{Annotation, Line, LineMetadata};
/// let line = Line::new("Bold text", LineMetadata::new(0, 0))
///     .with_annotation(Annotation::new(0, 4, Annotation::BOLD, "True"))
///     .unwrap();
/// assert!((bold_percent(&line) - 4.0 / 9.0).abs() < 1e-9);
/// ```
pub fn bold_percent(line: &Line) -> f64 {
    let len = line.char_len();
    if len == 0 {
        return 0.0;
    }
    let bold_chars = line
        .annotations_named(Annotation::BOLD)
        .filter(|annotation| is_true(annotation))
        .map(Annotation::len)
        .sum::<usize>();
    bold_chars as f64 / len as f64
}

/// 1 if the line starts with a bold character.
pub fn first_bold(line: &Line) -> f64 {
    let starts_bold = line
        .annotations_named(Annotation::BOLD)
        .any(|annotation| is_true(annotation) && annotation.start == 0);
    if starts_bold { 1.0 } else { 0.0 }
}

pub fn italic(line: &Line) -> f64 {
    if line.annotations_named(Annotation::ITALIC).next().is_some() {
        1.0
    } else {
        0.0
    }
}

pub fn underlined(line: &Line) -> f64 {
    if line.annotations_named(Annotation::UNDERLINED).next().is_some() {
        1.0
    } else {
        0.0
    }
}

/// Value of the first size annotation, 0 if there is none.
pub fn font_size(line: &Line) -> f64 {
    first_value(line, Annotation::SIZE).unwrap_or(0.0)
}

/// Distance to the previous line, -1 if unknown.
pub fn spacing(line: &Line) -> f64 {
    first_value(line, Annotation::SPACING).unwrap_or(-1.0)
}

pub fn indentation(line: &Line) -> f64 {
    first_value(line, Annotation::INDENTATION).unwrap_or(0.0)
}

#[derive(Debug, Default, Deserialize)]
struct Rgb {
    #[serde(default)]
    red: f64,
    #[serde(default)]
    green: f64,
    #[serde(default)]
    blue: f64,
}

/// `red`, `green`, `blue` and the dispersion of the three around their mean.
///
/// A missing or unreadable color annotation counts as black.
pub fn color(line: &Line) -> [(&'static str, f64); 4] {
    let Rgb { red, green, blue } = line
        .annotations_named(Annotation::COLOR)
        .next()
        .and_then(|annotation| serde_json::from_str(&annotation.value).ok())
        .unwrap_or_default();

    let mean = (red + green + blue) / 3.0;
    let dispersion = [red, green, blue]
        .iter()
        .map(|c| (c - mean).powi(2))
        .sum::<f64>()
        / 2.0;

    [
        ("red", red),
        ("green", green),
        ("blue", blue),
        ("color_dispersion", dispersion),
    ]
}

/// `alignment_left`, `alignment_center`, `alignment_right` indicators.
pub fn alignment(line: &Line) -> [(&'static str, f64); 3] {
    let has = |value: &str| {
        if line
            .annotations_named(Annotation::ALIGNMENT)
            .any(|annotation| annotation.value == value)
        {
            1.0
        } else {
            0.0
        }
    };
    [
        ("alignment_left", has("left")),
        ("alignment_center", has("center")),
        ("alignment_right", has("right")),
    ]
}

/// `style_heading` and `style_contents` indicators from the style names.
pub fn style(line: &Line) -> [(&'static str, f64); 2] {
    let style = line
        .annotations_named(Annotation::STYLE)
        .map(|annotation| annotation.value.to_lowercase())
        .collect::<String>();
    [
        ("style_heading", if style.contains("heading") { 1.0 } else { 0.0 }),
        ("style_contents", if style.contains("contents") { 1.0 } else { 0.0 }),
    ]
}

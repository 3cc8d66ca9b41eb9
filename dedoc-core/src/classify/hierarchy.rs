//! Hierarchy levels for lines labeled by the line-type classifier.
//!
//! A document is cut into a header (title lines), a table of contents and a
//! body. Body items get a depth from their numbering style, deeper numbers
//! get a larger `level_2`.

use std::cmp::Ordering;

use crate::{
    analysis::labels::LineType,
    features::{
        line_type::is_toc_start,
        patterns::{BULLET, NAMED_ITEM, REGEXPS_NUMBER, REGEXPS_SUBITEM},
    },
    layout::element::{HierarchyLevel, Line},
};

/// Depth of the body; header and toc sit next to it.
const BODY_DEPTH: u32 = 1;

/// Items are placed below every structural level of the body.
const ITEM_MIN_DEPTH: u32 = 5 + BODY_DEPTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Toc,
    Body,
}

/// Splits labeled lines into header, table of contents and body.
///
/// The body starts at the first part or item, or after the last toc or
/// title line, whichever comes first; it never ends.
pub fn sections(lines: &[Line], labels: &[LineType]) -> Vec<Section> {
    let last_toc_line = labels
        .iter()
        .rposition(|label| matches!(label, LineType::Toc | LineType::Title))
        .unwrap_or(0);

    let mut toc_begun = false;
    let mut body_begun = false;
    lines
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(line_id, (line, label))| {
            if body_begun || matches!(label, LineType::Part | LineType::Item) || line_id > last_toc_line {
                body_begun = true;
                Section::Body
            } else if *label == LineType::Toc || toc_begun || is_toc_start(line) {
                toc_begun = true;
                Section::Toc
            } else {
                Section::Header
            }
        })
        .collect()
}

/// Orders levels by `level_1` then `level_2`; a missing level sorts first.
fn compare(a: &HierarchyLevel, b: &HierarchyLevel) -> Ordering {
    (a.level_1, a.level_2).cmp(&(b.level_1, b.level_2))
}

fn body_item_level(line: &Line, label: LineType) -> HierarchyLevel {
    let text = line.text.trim().to_lowercase();
    let line_type = label.name();

    if label == LineType::Part {
        return HierarchyLevel::new(Some(BODY_DEPTH + 1), Some(0), true, line_type);
    }
    if NAMED_ITEM.is_match(&text) {
        let level_2 = if text.contains("подраздел") { 1 } else { 0 };
        return HierarchyLevel::new(Some(ITEM_MIN_DEPTH + 2), Some(level_2), false, line_type);
    }
    if let Some(number) = REGEXPS_NUMBER.find(&text) {
        let depth = number
            .as_str()
            .trim()
            .split('.')
            .filter(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
            .count();
        return HierarchyLevel::new(Some(ITEM_MIN_DEPTH + 3), Some(depth as u32), false, line_type);
    }
    if BULLET.is_match(&text) || REGEXPS_SUBITEM.is_match(&text) {
        return HierarchyLevel::new(Some(ITEM_MIN_DEPTH + 4), Some(0), false, line_type);
    }
    HierarchyLevel::raw_text()
}

/// Hierarchy level of every line, in line order.
///
/// # Example
/// ```
/// use dedoc_core::analysis::labels::LineType;
/// use dedoc_core::classify::hierarchy::hierarchy_levels;
/// use dedoc_core::layout::element::{Line, LineMetadata};
/// let lines = vec![
///     Line::new("Техническое задание", LineMetadata::new(0, 0)),
///     Line::new("1. Общие сведения", LineMetadata::new(0, 1)),
///     Line::new("1.1. Наименование", LineMetadata::new(0, 2)),
/// ];
/// let labels = [LineType::Title, LineType::Item, LineType::Item];
/// let levels = hierarchy_levels(&lines, &labels);
/// assert_eq!(levels[0].line_type, "title");
/// assert_eq!((levels[1].level_1, levels[1].level_2), (Some(9), Some(1)));
/// assert_eq!((levels[2].level_1, levels[2].level_2), (Some(9), Some(2)));
/// ```
pub fn hierarchy_levels(lines: &[Line], labels: &[LineType]) -> Vec<HierarchyLevel> {
    let mut previous: Option<HierarchyLevel> = None;

    sections(lines, labels)
        .into_iter()
        .zip(lines.iter().zip(labels))
        .map(|(section, (line, &label))| match section {
            Section::Header if label == LineType::Title => {
                HierarchyLevel::new(Some(BODY_DEPTH), Some(0), true, label.name())
            }
            Section::Header => HierarchyLevel::raw_text(),
            Section::Toc if is_toc_start(line) => {
                HierarchyLevel::new(Some(BODY_DEPTH), Some(0), false, LineType::Toc.name())
            }
            Section::Toc => HierarchyLevel::new(Some(BODY_DEPTH + 1), Some(0), false, "toc_item"),
            Section::Body => match label {
                LineType::Part | LineType::NamedItem | LineType::Item => {
                    let mut level = body_item_level(line, label);
                    if level.is_raw_text() {
                        return level;
                    }
                    if let Some(prev) = &previous {
                        let order = compare(prev, &level);
                        if order != Ordering::Greater && prev.level_1 == level.level_1 {
                            level.line_type = prev.line_type.clone();
                        } else if order == Ordering::Less && prev.line_type == LineType::Item.name() {
                            level.line_type = prev.line_type.clone();
                        }
                    }
                    previous = Some(level.clone());
                    level
                }
                _ => HierarchyLevel::raw_text(),
            },
        })
        .collect()
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snafu::ensure;
use uuid::Uuid;

use crate::{
    analysis::bbox::BBox,
    error::{DedocError, InvalidAnnotationSnafu},
};

/// A typed `[start, end)` character range over a line's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub start: usize,
    pub end: usize,
    pub name: String,
    pub value: String,
}

impl Annotation {
    pub const BOLD: &'static str = "bold";
    pub const ITALIC: &'static str = "italic";
    pub const UNDERLINED: &'static str = "underlined";
    pub const SIZE: &'static str = "size";
    pub const SPACING: &'static str = "spacing";
    pub const INDENTATION: &'static str = "indentation";
    pub const COLOR: &'static str = "color_annotation";
    pub const ALIGNMENT: &'static str = "alignment";
    pub const STYLE: &'static str = "style";
    /// Box of a line given as JSON, used when a line carries no location.
    pub const BBOX: &'static str = "bounding box";

    pub fn new(start: usize, end: usize, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            start,
            end,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Structural depth of a line.
///
/// The lower the levels, the more important the line. Raw text and lines of
/// unknown type carry no levels at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyLevel {
    pub level_1: Option<u32>,
    pub level_2: Option<u32>,
    pub can_be_multiline: bool,
    pub line_type: String,
}

impl HierarchyLevel {
    pub const ROOT: &'static str = "root";
    pub const RAW_TEXT: &'static str = "raw_text";
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(
        level_1: Option<u32>,
        level_2: Option<u32>,
        can_be_multiline: bool,
        line_type: impl Into<String>,
    ) -> Self {
        Self {
            level_1,
            level_2,
            can_be_multiline,
            line_type: line_type.into(),
        }
    }

    pub fn raw_text() -> Self {
        Self::new(None, None, true, Self::RAW_TEXT)
    }

    pub fn unknown() -> Self {
        Self::new(None, None, true, Self::UNKNOWN)
    }

    pub fn root() -> Self {
        Self::new(Some(0), Some(0), true, Self::ROOT)
    }

    pub fn is_raw_text(&self) -> bool {
        self.line_type == Self::RAW_TEXT
    }

    pub fn is_unknown(&self) -> bool {
        self.line_type == Self::UNKNOWN
    }
}

impl Default for HierarchyLevel {
    fn default() -> Self {
        Self::unknown()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMetadata {
    #[serde(default)]
    pub page_id: usize,
    #[serde(default)]
    pub line_id: usize,
    #[serde(default = "default_paragraph_type")]
    pub paragraph_type: String,
    #[serde(default)]
    pub predicted_classes: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub hierarchy_level: HierarchyLevel,
}

fn default_paragraph_type() -> String {
    HierarchyLevel::RAW_TEXT.to_string()
}

impl LineMetadata {
    pub fn new(page_id: usize, line_id: usize) -> Self {
        Self {
            page_id,
            line_id,
            paragraph_type: default_paragraph_type(),
            predicted_classes: None,
            hierarchy_level: HierarchyLevel::unknown(),
        }
    }
}

/// Where a line was found on the source page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub bbox: BBox,
    pub page_number: usize,
}

/// A text line with its metadata, style annotations and optional location.
///
/// Annotation ranges always lie within `[0, text.chars().count()]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLine")]
pub struct Line {
    pub text: String,
    pub metadata: LineMetadata,
    annotations: Vec<Annotation>,
    pub location: Option<Location>,
    pub uid: String,
}

impl Line {
    pub fn new(text: impl Into<String>, metadata: LineMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
            annotations: Vec::new(),
            location: None,
            uid: format!("line_{}", Uuid::new_v4()),
        }
    }

    pub fn with_location(mut self, bbox: BBox, page_number: usize) -> Self {
        self.location = Some(Location { bbox, page_number });
        self
    }

    /// Adds an annotation, checking that it fits into the text.
    ///
    /// # Errors
    /// [`DedocError::InvalidAnnotation`] if `start > end` or `end` is past the
    /// last character.
    ///
    /// # Example
    /// ```
    /// use dedoc_core::layout::element::{Annotation, Line, LineMetadata};
    /// let line = Line::new("Title", LineMetadata::new(0, 0))
    ///     .with_annotation(Annotation::new(0, 5, Annotation::BOLD, "True"))
    ///     .unwrap();
    /// assert_eq!(line.annotations().len(), 1);
    /// assert!(line.clone().with_annotation(Annotation::new(0, 6, Annotation::BOLD, "True")).is_err());
    /// ```
    pub fn with_annotation(mut self, annotation: Annotation) -> Result<Self, DedocError> {
        self.add_annotation(annotation)?;
        Ok(self)
    }

    pub fn add_annotation(&mut self, annotation: Annotation) -> Result<(), DedocError> {
        let len = self.text.chars().count();
        ensure!(
            annotation.start <= annotation.end && annotation.end <= len,
            InvalidAnnotationSnafu {
                name: annotation.name.clone(),
                start: annotation.start,
                end: annotation.end,
                len,
            }
        );
        self.annotations.push(annotation);
        Ok(())
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Annotations with the given name, in insertion order.
    pub fn annotations_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations.iter().filter(move |a| a.name == name)
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.location.map(|location| location.bbox)
    }

    /// Number of characters, as used by annotation ranges.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Deserialize)]
struct RawLine {
    text: String,
    #[serde(default = "default_metadata")]
    metadata: LineMetadata,
    #[serde(default)]
    annotations: Vec<Annotation>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    uid: Option<String>,
}

fn default_metadata() -> LineMetadata {
    LineMetadata::new(0, 0)
}

impl TryFrom<RawLine> for Line {
    type Error = DedocError;

    fn try_from(raw: RawLine) -> Result<Self, Self::Error> {
        let mut line = Line::new(raw.text, raw.metadata);
        for annotation in raw.annotations {
            line.add_annotation(annotation)?;
        }
        line.location = raw.location;
        if let Some(uid) = raw.uid {
            line.uid = uid;
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_range_uses_chars() {
        // 6 characters, 12 bytes
        let mut line = Line::new("раздел", LineMetadata::new(0, 0));
        assert!(line.add_annotation(Annotation::new(0, 6, Annotation::BOLD, "True")).is_ok());
        let err = line
            .add_annotation(Annotation::new(2, 7, Annotation::ITALIC, "True"))
            .unwrap_err();
        assert!(matches!(err, DedocError::InvalidAnnotation { len: 6, .. }));
        assert!(line.add_annotation(Annotation::new(3, 2, Annotation::SIZE, "12")).is_err());
    }

    #[test]
    fn test_annotations_named() {
        let line = Line::new("abc", LineMetadata::new(0, 0))
            .with_annotation(Annotation::new(0, 1, Annotation::SIZE, "12"))
            .unwrap()
            .with_annotation(Annotation::new(0, 3, Annotation::BOLD, "True"))
            .unwrap()
            .with_annotation(Annotation::new(1, 3, Annotation::SIZE, "14"))
            .unwrap();
        let sizes: Vec<_> = line
            .annotations_named(Annotation::SIZE)
            .map(|a| a.value.as_str())
            .collect();
        assert_eq!(sizes, vec!["12", "14"]);
    }

    #[test]
    fn test_hierarchy_level_constructors() {
        let raw = HierarchyLevel::raw_text();
        assert!(raw.is_raw_text());
        assert_eq!((raw.level_1, raw.level_2), (None, None));
        assert!(raw.can_be_multiline);

        let root = HierarchyLevel::root();
        assert_eq!((root.level_1, root.level_2), (Some(0), Some(0)));
        assert!(HierarchyLevel::default().is_unknown());
    }

    #[test]
    fn test_deserialize_line() {
        let line: Line = serde_json::from_str(
            r#"{
                "text": "1. Scope",
                "metadata": {"page_id": 1, "line_id": 4},
                "annotations": [{"start": 0, "end": 2, "name": "bold", "value": "True"}],
                "location": {"bbox": {"x_top_left": 10, "y_top_left": 20, "width": 100, "height": 12}, "page_number": 1}
            }"#,
        )
        .unwrap();
        assert_eq!(line.metadata.line_id, 4);
        assert_eq!(line.metadata.paragraph_type, "raw_text");
        assert_eq!(line.bbox().map(|b| b.x_top_left), Some(10));
        assert!(line.uid.starts_with("line_"));

        let bad = serde_json::from_str::<Line>(
            r#"{"text": "ab", "annotations": [{"start": 0, "end": 3, "name": "bold", "value": "True"}]}"#,
        );
        assert!(bad.is_err());
    }
}

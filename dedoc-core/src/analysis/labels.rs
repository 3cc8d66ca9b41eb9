use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::DedocError;

/// Output of the paragraph classifier.
///
/// `Paragraph` marks a line that starts a new paragraph, so it can not be
/// glued to the previous line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphLabel {
    Paragraph,
    NotParagraph,
}

impl ParagraphLabel {
    pub const fn name(&self) -> &'static str {
        match self {
            ParagraphLabel::Paragraph => "paragraph",
            ParagraphLabel::NotParagraph => "not_paragraph",
        }
    }

    pub const fn can_be_multiline(&self) -> bool {
        !matches!(self, ParagraphLabel::Paragraph)
    }
}

impl Default for ParagraphLabel {
    fn default() -> Self {
        ParagraphLabel::NotParagraph
    }
}

/// Structural type of a line in a technical-specification-like document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Title,
    Toc,
    Part,
    NamedItem,
    Item,
    RawText,
}

impl LineType {
    pub const fn name(&self) -> &'static str {
        match self {
            LineType::Title => "title",
            LineType::Toc => "toc",
            LineType::Part => "part",
            LineType::NamedItem => "named_item",
            LineType::Item => "item",
            LineType::RawText => "raw_text",
        }
    }

    pub const fn idx(&self) -> usize {
        match self {
            LineType::Title => 0,
            LineType::Toc => 1,
            LineType::Part => 2,
            LineType::NamedItem => 3,
            LineType::Item => 4,
            LineType::RawText => 5,
        }
    }

    pub const fn label_size() -> usize {
        6
    }

    pub const fn all() -> [LineType; 6] {
        [
            LineType::Title,
            LineType::Toc,
            LineType::Part,
            LineType::NamedItem,
            LineType::Item,
            LineType::RawText,
        ]
    }
}

macro_rules! impl_label_parsing {
    ($($label:ty => $classifier:literal),*) => {
        $(
            impl fmt::Display for $label {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }

            impl FromStr for $label {
                type Err = DedocError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
                        DedocError::UnknownLabel {
                            classifier: $classifier.to_string(),
                            label: s.to_string(),
                        }
                    })
                }
            }
        )*
    };
}

impl_label_parsing!(ParagraphLabel => "paragraph", LineType => "line_type");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_names_round_trip_through_from_str() {
        for label in LineType::all() {
            assert_eq!(label.name().parse::<LineType>().unwrap(), label);
        }
        assert_eq!(
            "not_paragraph".parse::<ParagraphLabel>().unwrap(),
            ParagraphLabel::NotParagraph
        );
    }

    #[test]
    fn test_unknown_label() {
        let err = "heading".parse::<LineType>().unwrap_err();
        assert!(matches!(err, DedocError::UnknownLabel { .. }));
    }

    #[test]
    fn test_idx_matches_all_order() {
        for (i, label) in LineType::all().iter().enumerate() {
            assert_eq!(label.idx(), i);
        }
        assert_eq!(LineType::all().len(), LineType::label_size());
    }

    #[test]
    fn test_paragraph_multiline() {
        assert!(!ParagraphLabel::Paragraph.can_be_multiline());
        assert!(ParagraphLabel::NotParagraph.can_be_multiline());
    }
}

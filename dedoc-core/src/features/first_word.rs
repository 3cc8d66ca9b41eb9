use std::collections::{BTreeMap, HashMap};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    consts::{FIRST_WORD_MAX_FEATURES, FIRST_WORD_MIN_COUNT},
    error::DedocError,
    features::{FeatureExtractor, matrix::FeatureMatrix},
    layout::element::Line,
};

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
pub struct FirstWordConfig {
    /// A word must start at least this many lines to enter the vocabulary.
    pub min_count: usize,
    pub max_features: usize,
}

impl Default for FirstWordConfig {
    fn default() -> Self {
        Self {
            min_count: FIRST_WORD_MIN_COUNT,
            max_features: FIRST_WORD_MAX_FEATURES,
        }
    }
}

/// One-hot encoding of the first word of a line weighted by its inverse
/// document frequency, with the same block for the previous and next lines.
///
/// The vocabulary is learned by [`FeatureExtractor::fit`]; an unfitted
/// extractor produces no columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirstWordExtractor {
    config: FirstWordConfig,
    /// word -> idf weight
    vocabulary: BTreeMap<String, f64>,
}

/// Lowercased first token of the line with surrounding punctuation removed.
///
/// # Example
/// ```
/// use dedoc_core::features::first_word::first_word;
/// assert_eq!(first_word("  Приложение 1."), Some("приложение".to_string()));
/// assert_eq!(first_word("(see below)"), Some("see".to_string()));
/// assert_eq!(first_word(" 12 "), None);
/// ```
pub fn first_word(text: &str) -> Option<String> {
    let token = text.split_whitespace().next()?;
    let word = token
        .trim_matches(|c: char| !c.is_alphabetic())
        .to_lowercase();
    (!word.is_empty()).then_some(word)
}

impl FirstWordExtractor {
    pub fn new(config: FirstWordConfig) -> Self {
        Self {
            config,
            vocabulary: BTreeMap::new(),
        }
    }

    /// Restores a fitted extractor from its [`FeatureExtractor::parameters`].
    pub fn from_parameters(parameters: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(parameters)
    }

    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.vocabulary.keys().map(String::as_str)
    }

    pub(crate) fn one_document(&self, lines: &[Line]) -> Result<FeatureMatrix, DedocError> {
        let words = lines
            .iter()
            .map(|line| first_word(&line.text))
            .collect::<Vec<_>>();

        let columns = self.vocabulary.iter().map(|(word, idf)| {
            let values = words
                .iter()
                .map(|first| if first.as_deref() == Some(word.as_str()) { *idf } else { 0.0 })
                .collect::<Vec<_>>();
            (format!("first_word_{}", word), values)
        });
        FeatureMatrix::from_columns(lines.len(), columns)?.with_context(1, 1)
    }
}

impl FeatureExtractor for FirstWordExtractor {
    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn fit(&mut self, documents: &[Vec<Line>]) -> Result<(), DedocError> {
        let mut counts = HashMap::<String, usize>::new();
        let mut total = 0usize;
        for line in documents.iter().flatten() {
            total += 1;
            if let Some(word) = first_word(&line.text) {
                *counts.entry(word).or_default() += 1;
            }
        }

        let mut frequent = counts
            .into_iter()
            .filter(|(_, count)| *count >= self.config.min_count)
            .collect::<Vec<_>>();
        frequent.sort_by(|(a_word, a_count), (b_word, b_count)| {
            b_count.cmp(a_count).then_with(|| a_word.cmp(b_word))
        });
        frequent.truncate(self.config.max_features);

        // smoothed idf: ln((1 + n) / (1 + df)) + 1
        self.vocabulary = frequent
            .into_iter()
            .map(|(word, count)| {
                let idf = ((1.0 + total as f64) / (1.0 + count as f64)).ln() + 1.0;
                (word, idf)
            })
            .collect();
        Ok(())
    }

    fn transform(&self, documents: &[Vec<Line>]) -> Result<FeatureMatrix, DedocError> {
        let parts = documents
            .iter()
            .map(|document| self.one_document(document))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() {
            return self.one_document(&[]);
        }
        FeatureMatrix::vstack(parts)
    }
}

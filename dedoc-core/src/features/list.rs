use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    consts::LIST_WINDOW_SIZE,
    error::DedocError,
    features::{FeatureExtractor, matrix::FeatureMatrix, prefix::LinePrefix},
    layout::element::Line,
};

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
pub struct ListFeaturesConfig {
    /// Number of lines inspected on each side of a line.
    pub window_size: usize,
}

impl Default for ListFeaturesConfig {
    fn default() -> Self {
        Self {
            window_size: LIST_WINDOW_SIZE,
        }
    }
}

/// Windowed list-structure features.
///
/// For every line the prefixes of up to `window_size` lines before and after it
/// are compared with its own prefix: how many neighbours share its
/// indentation, how many can precede or follow it in a list, and how many do
/// both. Counts are divided by the window length.
#[derive(Debug, Clone, Default)]
pub struct ListFeaturesExtractor {
    config: ListFeaturesConfig,
}

struct Window<'a> {
    indent_std: f64,
    before: &'a [LinePrefix],
    after: &'a [LinePrefix],
}

impl ListFeaturesExtractor {
    pub fn new(config: ListFeaturesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ListFeaturesConfig {
        &self.config
    }

    pub fn feature_names(&self) -> [String; 3] {
        let w = self.config.window_size;
        [
            format!("same_indent_{}", w),
            format!("predecessor_num_same_indent_{}", w),
            format!("predecessor_num_{}", w),
        ]
    }

    /// Prefixes of the document's lines and their features.
    pub fn one_document(&self, lines: &[Line]) -> Result<(Vec<LinePrefix>, FeatureMatrix), DedocError> {
        let prefixes = lines.iter().map(LinePrefix::of_line).collect::<Vec<_>>();
        let indents = prefixes.iter().map(|prefix| prefix.indent).collect::<Vec<_>>();

        let mut columns = [
            Vec::with_capacity(lines.len()),
            Vec::with_capacity(lines.len()),
            Vec::with_capacity(lines.len()),
        ];
        for (line_id, prefix) in prefixes.iter().enumerate() {
            let window = self.window(&indents, &prefixes, line_id);
            let [same_indent, same_indent_predecessor, predecessor] = one_line_features(prefix, &window);
            columns[0].push(same_indent);
            columns[1].push(same_indent_predecessor);
            columns[2].push(predecessor);
        }

        let matrix = FeatureMatrix::from_columns(lines.len(), self.feature_names().into_iter().zip(columns))?;
        Ok((prefixes, matrix))
    }

    fn window<'a>(&self, indents: &[f64], prefixes: &'a [LinePrefix], line_id: usize) -> Window<'a> {
        let left = line_id.saturating_sub(self.config.window_size);
        let right = (line_id + self.config.window_size).min(prefixes.len());
        Window {
            indent_std: population_std(&indents[left..right]),
            before: &prefixes[left..line_id],
            after: prefixes.get(line_id + 1..right).unwrap_or(&[]),
        }
    }
}

impl FeatureExtractor for ListFeaturesExtractor {
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "window_size": self.config.window_size })
    }

    fn fit(&mut self, _documents: &[Vec<Line>]) -> Result<(), DedocError> {
        Ok(())
    }

    fn transform(&self, documents: &[Vec<Line>]) -> Result<FeatureMatrix, DedocError> {
        let parts = documents
            .iter()
            .map(|document| self.one_document(document).map(|(_, matrix)| matrix))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() {
            return FeatureMatrix::from_columns(0, self.feature_names().map(|name| (name, Vec::new())));
        }
        FeatureMatrix::vstack(parts)
    }
}

fn one_line_features(prefix: &LinePrefix, window: &Window<'_>) -> [f64; 3] {
    let mut same_indent = 0usize;
    let mut same_indent_predecessor = 0usize;
    let mut predecessor = 0usize;

    for other in window.before.iter().chain(window.after) {
        let is_predecessor = prefix.predecessor(other) || prefix.successor(other);
        let is_same_indent = (prefix.indent - other.indent).abs() <= 0.1 * window.indent_std + 1.0;
        predecessor += is_predecessor as usize;
        same_indent += is_same_indent as usize;
        same_indent_predecessor += (is_predecessor && is_same_indent) as usize;
    }

    let size = (window.before.len() + window.after.len() + 1) as f64;
    [
        same_indent as f64 / size,
        same_indent_predecessor as f64 / size,
        predecessor as f64 / size,
    ]
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

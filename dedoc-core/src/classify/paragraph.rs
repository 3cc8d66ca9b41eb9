use tracing::*;

use crate::{
    analysis::labels::ParagraphLabel,
    error::DedocError,
    features::{matrix::FeatureMatrix, paragraph::ParagraphFeatureExtractor},
    inference::{LazyModel, ModelSource},
    layout::element::Line,
};

/// Decides for every line whether it continues a paragraph that may span
/// several lines.
///
/// The labels are written onto the lines in place: `metadata.paragraph_type`
/// gets the label name and `hierarchy_level.can_be_multiline` tells whether
/// the line may be glued to the previous one.
#[derive(Debug)]
pub struct ParagraphClassifier {
    model: LazyModel,
    features: ParagraphFeatureExtractor,
}

impl Default for ParagraphClassifier {
    fn default() -> Self {
        Self::new(LazyModel::new(ModelSource::paragraph()))
    }
}

/// A batch the model must not see: no text at all, or some feature missing
/// on every line.
fn is_degenerate(lines: &[Line], features: &FeatureMatrix) -> bool {
    if lines.iter().all(|line| line.text.trim().is_empty()) {
        return true;
    }
    features.nrows() > 0
        && features
            .values()
            .columns()
            .into_iter()
            .any(|column| column.iter().all(|x| x.is_nan()))
}

impl ParagraphClassifier {
    pub fn new(model: LazyModel) -> Self {
        Self {
            model,
            features: ParagraphFeatureExtractor::default(),
        }
    }

    pub fn model(&self) -> &LazyModel {
        &self.model
    }

    /// One label per line, in line order.
    pub fn predict(&self, lines: &[Line]) -> Result<Vec<ParagraphLabel>, DedocError> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let features = self.features.document_features(lines)?;
        if is_degenerate(lines, &features) {
            debug!(
                "Paragraph features of {} lines are degenerate, every line is not a paragraph",
                lines.len()
            );
            return Ok(vec![ParagraphLabel::NotParagraph; lines.len()]);
        }

        let artifact = self.model.get()?;
        let predicted = artifact.predict(&features)?;
        predicted
            .iter()
            .zip(lines)
            .map(|(label, line)| {
                if line.text.trim().is_empty() {
                    return Ok(ParagraphLabel::NotParagraph);
                }
                label.parse::<ParagraphLabel>()
            })
            .collect()
    }

    /// Labels the lines and writes the labels onto their metadata.
    pub fn classify(&self, lines: &mut [Line]) -> Result<(), DedocError> {
        let labels = self.predict(lines)?;
        for (line, label) in lines.iter_mut().zip(labels) {
            line.metadata.paragraph_type = label.name().to_string();
            line.metadata.hierarchy_level.can_be_multiline = label.can_be_multiline();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2};

    use super::*;
    use crate::{
        analysis::bbox::BBox,
        inference::{DecisionModel, ModelArtifact, linear::LinearModel},
        layout::element::LineMetadata,
    };

    fn located(text: &str, line_id: usize, bbox: BBox) -> Line {
        Line::new(text, LineMetadata::new(0, line_id)).with_location(bbox, 0)
    }

    fn document() -> Vec<Line> {
        vec![
            located("    Indented start", 0, BBox::new(100, 0, 400, 20)),
            located("continued text", 1, BBox::new(10, 25, 490, 20)),
            located("", 2, BBox::new(100, 50, 400, 20)),
            located("more text", 3, BBox::new(10, 75, 490, 20)),
        ]
    }

    /// Paragraph whenever the line is indented more than the others.
    fn indent_model(feature_names: Vec<String>) -> ModelArtifact {
        let mut coefficients = Array2::zeros((1, feature_names.len()));
        if let Some(indent) = feature_names.iter().position(|name| name == "indent") {
            coefficients[[0, indent]] = 10.0;
        }
        ModelArtifact {
            classifier: DecisionModel::Linear(LinearModel {
                classes: vec!["not_paragraph".into(), "paragraph".into()],
                coefficients,
                intercepts: Array1::from_elem(1, -6.0),
            }),
            feature_names,
            parameters: serde_json::Value::Null,
        }
    }

    fn trained_columns(lines: &[Line]) -> Vec<String> {
        ParagraphFeatureExtractor::default()
            .document_features(lines)
            .unwrap()
            .columns()
            .to_vec()
    }

    fn unreachable_model() -> LazyModel {
        LazyModel::new(ModelSource::new("/nonexistent/dedoc/paragraph.json.gz"))
    }

    #[test]
    fn test_empty_lines_skip_model() {
        let classifier = ParagraphClassifier::new(unreachable_model());
        let mut lines = (0..3)
            .map(|i| Line::new("", LineMetadata::new(0, i)))
            .collect::<Vec<_>>();
        classifier.classify(&mut lines).unwrap();

        assert!(!classifier.model().is_loaded());
        for line in &lines {
            assert_eq!(line.metadata.paragraph_type, "not_paragraph");
            assert!(line.metadata.hierarchy_level.can_be_multiline);
        }
    }

    #[test]
    fn test_missing_geometry_skips_model() {
        let classifier = ParagraphClassifier::new(unreachable_model());
        let lines = vec![
            Line::new("first line", LineMetadata::new(0, 0)),
            Line::new("second line", LineMetadata::new(0, 1)),
        ];
        let labels = classifier.predict(&lines).unwrap();
        assert_eq!(labels, vec![ParagraphLabel::NotParagraph; 2]);
        assert!(!classifier.model().is_loaded());
    }

    #[test]
    fn test_model_labels_are_written() {
        let mut lines = document();
        let model = indent_model(trained_columns(&lines));
        let classifier = ParagraphClassifier::new(LazyModel::preloaded(model));
        classifier.classify(&mut lines).unwrap();

        assert_eq!(lines[0].metadata.paragraph_type, "paragraph");
        assert!(!lines[0].metadata.hierarchy_level.can_be_multiline);
        assert_eq!(lines[1].metadata.paragraph_type, "not_paragraph");
        assert!(lines[1].metadata.hierarchy_level.can_be_multiline);
        // empty text is never a paragraph, whatever the model says
        assert_eq!(lines[2].metadata.paragraph_type, "not_paragraph");
    }

    #[test]
    fn test_schema_mismatch_is_an_error() {
        let lines = document();
        let mut columns = trained_columns(&lines);
        columns.push("unknown_feature".into());
        let classifier = ParagraphClassifier::new(LazyModel::preloaded(indent_model(columns)));

        match classifier.predict(&lines).unwrap_err() {
            DedocError::FeatureSchemaMismatch { missing, unexpected } => {
                assert_eq!(missing, vec!["unknown_feature".to_string()]);
                assert!(unexpected.is_empty());
            }
            other => panic!("unexpected error {other}"),
        }
    }
}

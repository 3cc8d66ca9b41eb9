use std::collections::BTreeMap;

use ndarray::{Array2, s};
use once_cell::sync::OnceCell;
use tracing::*;

use crate::{
    analysis::labels::LineType,
    classify::hierarchy::hierarchy_levels,
    consts::PART_SIZE_GAP,
    error::DedocError,
    features::{
        line_type::{LineTypeFeatureExtractor, is_upper},
        typography,
    },
    inference::{Classifier, LazyModel, ModelArtifact, ModelSource},
    layout::element::{Annotation, Line},
};

/// Labels lines of a technical specification with their structural type and
/// turns the labels into hierarchy levels.
///
/// The model probabilities are patched with what is known about such
/// documents: a title comes first and is not interrupted, an empty line is
/// raw text, a table of contents ends where the body begins.
#[derive(Debug)]
pub struct LineTypeClassifier {
    model: LazyModel,
    features: OnceCell<LineTypeFeatureExtractor>,
}

impl Default for LineTypeClassifier {
    fn default() -> Self {
        Self::new(LazyModel::new(ModelSource::line_type()))
    }
}

/// Line styled as a generated table of contents entry.
fn is_auto_toc_line(line: &Line) -> bool {
    line.annotations_named(Annotation::STYLE).next().is_some_and(|style| {
        let style = style.value.to_lowercase();
        style.starts_with("toc") || style.starts_with("contents")
    })
}

/// Font size, one point more for long upper case lines.
fn line_size(line: &Line) -> f64 {
    let caps = is_upper(&line.text) && line.text.trim().chars().count() > 4;
    typography::font_size(line) + if caps { 1.0 } else { 0.0 }
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let middle = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[middle - 1] + values[middle]) / 2.0
    } else {
        values[middle]
    }
}

/// Most probable label per row; ties go to the first label.
fn argmax_labels(proba: &Array2<f64>) -> Vec<LineType> {
    let labels = LineType::all();
    proba
        .rows()
        .into_iter()
        .map(|row| {
            let (best, _) = row
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (id, &p)| if p > best.1 { (id, p) } else { best });
            labels[best]
        })
        .collect()
}

/// Reorders the model output into one column per [`LineType`], in
/// [`LineType::all`] order. Labels the model does not know get 0.
fn label_probabilities(artifact: &ModelArtifact, proba: Array2<f64>) -> Result<Array2<f64>, DedocError> {
    let classes = artifact.classifier.classes();
    let mut result = Array2::zeros((proba.nrows(), LineType::label_size()));
    for (column, class) in classes.iter().enumerate() {
        let label = class.parse::<LineType>()?;
        result.column_mut(label.idx()).assign(&proba.column(column));
    }
    Ok(result)
}

/// Applies the document-level constraints to the label probabilities in place.
pub fn patch_probabilities(lines: &[Line], proba: &mut Array2<f64>) {
    let title = LineType::Title.idx();
    let toc = LineType::Toc.idx();
    let raw_text = LineType::RawText.idx();

    for (mut row, line) in proba.rows_mut().into_iter().zip(lines) {
        if line.text.trim().is_empty() {
            row.fill(0.0);
            row[raw_text] = 1.0;
        }
    }

    let labels = argmax_labels(proba);
    let first_non_title = labels
        .iter()
        .position(|label| !matches!(label, LineType::Title | LineType::RawText))
        .unwrap_or(0);
    for (line_id, mut row) in proba.rows_mut().into_iter().enumerate() {
        if line_id < first_non_title {
            row.fill(0.0);
            row[title] = 1.0;
        } else {
            row[title] = 0.0;
        }
    }

    let mut auto_toc = lines.iter().map(is_auto_toc_line).collect::<Vec<_>>();
    if let Some(first_auto_toc) = auto_toc.iter().position(|&is_toc| is_toc) {
        // the contents heading right before generated entries belongs to the toc
        let first_toc = labels.iter().position(|label| *label == LineType::Toc);
        if let Some(first_toc) = first_toc.filter(|&id| id > 0) {
            for flag in auto_toc.iter_mut().take(first_auto_toc).skip(first_toc) {
                *flag = true;
            }
        }
        for (mut row, is_toc) in proba.rows_mut().into_iter().zip(&auto_toc) {
            row[toc] = if *is_toc { 1.0 } else { 0.0 };
        }
    } else {
        let first_item = labels
            .iter()
            .position(|label| matches!(label, LineType::Item | LineType::Part))
            .unwrap_or(0);
        proba.slice_mut(s![first_item.., toc]).fill(0.0);
    }

    let toc_start = lines
        .iter()
        .position(|line| line.text.trim().to_lowercase() == "содержание");
    if let Some(toc_start) = toc_start {
        proba.slice_mut(s![..toc_start, toc]).fill(0.0);
    }
}

/// Large items become parts, any other part is demoted to a named item.
pub fn postprocess_labels(lines: &[Line], labels: Vec<LineType>) -> Vec<LineType> {
    let sizes = lines.iter().map(line_size).collect::<Vec<_>>();
    let threshold = median(sizes.clone()) + PART_SIZE_GAP;

    labels
        .into_iter()
        .zip(sizes)
        .map(|(label, size)| match label {
            LineType::Item | LineType::Part | LineType::NamedItem if size >= threshold => LineType::Part,
            LineType::Part => LineType::NamedItem,
            other => other,
        })
        .collect()
}

impl LineTypeClassifier {
    pub fn new(model: LazyModel) -> Self {
        Self {
            model,
            features: OnceCell::new(),
        }
    }

    pub fn model(&self) -> &LazyModel {
        &self.model
    }

    /// The feature extractor stored next to the model, or the default one
    /// when the artifact has no parameters.
    fn extractor(&self, artifact: &ModelArtifact) -> Result<&LineTypeFeatureExtractor, DedocError> {
        self.features.get_or_try_init(|| {
            if artifact.parameters.is_null() {
                debug!("Line type model has no feature parameters, using the default features");
                Ok(LineTypeFeatureExtractor::default())
            } else {
                LineTypeFeatureExtractor::from_parameters(&artifact.parameters)
            }
        })
    }

    /// Patched probabilities of every label, one row per line.
    pub fn predict_proba(&self, lines: &[Line]) -> Result<Array2<f64>, DedocError> {
        if lines.is_empty() {
            return Ok(Array2::zeros((0, LineType::label_size())));
        }
        let artifact = self.model.get()?;
        let features = self.extractor(artifact)?.document_features(lines)?;
        let mut proba = label_probabilities(artifact, artifact.predict_proba(&features)?)?;
        patch_probabilities(lines, &mut proba);
        Ok(proba)
    }

    pub fn predict(&self, lines: &[Line]) -> Result<Vec<LineType>, DedocError> {
        let proba = self.predict_proba(lines)?;
        Ok(postprocess_labels(lines, argmax_labels(&proba)))
    }

    /// Labels the lines and writes the probabilities and hierarchy levels
    /// onto their metadata.
    pub fn classify(&self, lines: &mut [Line]) -> Result<Vec<LineType>, DedocError> {
        let proba = self.predict_proba(lines)?;
        let labels = postprocess_labels(lines, argmax_labels(&proba));
        let levels = hierarchy_levels(lines, &labels);

        for ((line, level), row) in lines.iter_mut().zip(levels).zip(proba.rows()) {
            let classes = LineType::all()
                .iter()
                .zip(row.iter())
                .map(|(label, p)| (label.name().to_string(), *p))
                .collect::<BTreeMap<_, _>>();
            line.metadata.predicted_classes = Some(classes);
            line.metadata.hierarchy_level = level;
        }
        Ok(labels)
    }
}

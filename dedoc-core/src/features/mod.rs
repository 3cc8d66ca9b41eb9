pub mod first_word;
pub mod line_type;
pub mod list;
pub mod matrix;
pub mod normalize;
pub mod paragraph;
pub mod patterns;
pub mod prefix;
pub mod regexp;
pub mod typography;

use tracing::*;

use crate::{error::DedocError, layout::element::Line};
use matrix::FeatureMatrix;

/// Turns documents (each a list of lines) into one feature matrix.
///
/// Rows follow the lines of all documents in order. Context features never
/// cross document boundaries.
pub trait FeatureExtractor {
    /// Parameters needed to rebuild this extractor, fitted state included.
    fn parameters(&self) -> serde_json::Value;

    fn fit(&mut self, documents: &[Vec<Line>]) -> Result<(), DedocError>;

    fn transform(&self, documents: &[Vec<Line>]) -> Result<FeatureMatrix, DedocError>;

    fn fit_transform(&mut self, documents: &[Vec<Line>]) -> Result<FeatureMatrix, DedocError> {
        self.fit(documents)?;
        self.transform(documents)
    }
}

/// Wraps an extractor and pins its output columns to the ones seen by `fit`.
///
/// After fitting, every `transform` must produce exactly the fitted column
/// set, otherwise [`DedocError::FeatureSchemaMismatch`] is returned. Columns
/// are reordered to the fitted order, never padded or dropped.
#[derive(Debug, Clone)]
pub struct SchemaChecked<E> {
    inner: E,
    columns: Option<Vec<String>>,
}

impl<E: FeatureExtractor> SchemaChecked<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            columns: None,
        }
    }

    /// An extractor whose schema is already known, e.g. from a model artifact.
    pub fn with_columns(inner: E, columns: Vec<String>) -> Self {
        Self {
            inner,
            columns: Some(columns),
        }
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: FeatureExtractor> FeatureExtractor for SchemaChecked<E> {
    fn parameters(&self) -> serde_json::Value {
        self.inner.parameters()
    }

    fn fit(&mut self, documents: &[Vec<Line>]) -> Result<(), DedocError> {
        let matrix = self.inner.fit_transform(documents)?;
        debug!("Fitted feature schema with {} columns", matrix.ncols());
        self.columns = Some(matrix.columns().to_vec());
        Ok(())
    }

    fn transform(&self, documents: &[Vec<Line>]) -> Result<FeatureMatrix, DedocError> {
        let matrix = self.inner.transform(documents)?;
        match &self.columns {
            Some(columns) => matrix.conform_to(columns),
            None => Ok(matrix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::element::LineMetadata;

    /// One column per distinct line text.
    struct TextColumns;

    impl FeatureExtractor for TextColumns {
        fn parameters(&self) -> serde_json::Value {
            serde_json::Value::Null
        }

        fn fit(&mut self, _documents: &[Vec<Line>]) -> Result<(), DedocError> {
            Ok(())
        }

        fn transform(&self, documents: &[Vec<Line>]) -> Result<FeatureMatrix, DedocError> {
            let lines = documents.iter().flatten().collect::<Vec<_>>();
            let mut names = lines.iter().map(|line| line.text.clone()).collect::<Vec<_>>();
            names.sort();
            names.dedup();
            let columns = names
                .into_iter()
                .map(|name| {
                    let values = lines
                        .iter()
                        .map(|line| if line.text == name { 1.0 } else { 0.0 })
                        .collect::<Vec<f64>>();
                    (name, values)
                })
                .collect::<Vec<_>>();
            FeatureMatrix::from_columns(lines.len(), columns)
        }
    }

    fn docs(texts: &[&str]) -> Vec<Vec<Line>> {
        vec![
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| Line::new(*text, LineMetadata::new(0, i)))
                .collect(),
        ]
    }

    #[test]
    fn test_same_columns_pass() {
        let mut extractor = SchemaChecked::new(TextColumns);
        extractor.fit(&docs(&["b", "a"])).unwrap();
        let matrix = extractor.transform(&docs(&["a", "b", "a"])).unwrap();
        assert_eq!(matrix.columns(), &["a", "b"]);
        assert_eq!(matrix.nrows(), 3);
    }

    #[test]
    fn test_different_columns_fail() {
        let mut extractor = SchemaChecked::new(TextColumns);
        extractor.fit(&docs(&["a", "b"])).unwrap();
        let err = extractor.transform(&docs(&["a", "c"])).unwrap_err();
        match err {
            DedocError::FeatureSchemaMismatch {
                missing,
                unexpected,
            } => {
                assert_eq!(missing, vec!["b".to_string()]);
                assert_eq!(unexpected, vec!["c".to_string()]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_unfitted_passes_through() {
        let extractor = SchemaChecked::new(TextColumns);
        assert!(extractor.columns().is_none());
        let matrix = extractor.transform(&docs(&["x"])).unwrap();
        assert_eq!(matrix.columns(), &["x"]);
    }
}

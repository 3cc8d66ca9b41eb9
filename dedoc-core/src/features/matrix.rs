use std::collections::HashSet;

use ndarray::{Array1, Array2, ArrayView1, Axis, ErrorKind, ShapeError, concatenate, s};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{DedocError, ShapeSnafu};

/// Named numeric features, one row per line.
///
/// Rows of several documents are stacked in document order; column names are
/// unique within a matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self, DedocError> {
        if columns.len() != values.ncols() {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape))
                .context(ShapeSnafu {
                    stage: "feature-matrix",
                });
        }
        check_unique(&columns)?;

        Ok(Self { columns, values })
    }

    /// A matrix with `nrows` rows and no columns.
    pub fn empty(nrows: usize) -> Self {
        Self {
            columns: Vec::new(),
            values: Array2::zeros((nrows, 0)),
        }
    }

    /// Builds a matrix from `(name, values)` pairs; every column must hold `nrows` values.
    ///
    /// # Example
    /// ```
    /// use dedoc_core::features::matrix::FeatureMatrix;
    /// let matrix = FeatureMatrix::from_columns(2, vec![("a", vec![1.0, 2.0]), ("b", vec![0.0, 1.0])]).unwrap();
    /// assert_eq!(matrix.columns(), &["a".to_string(), "b".to_string()]);
    /// assert_eq!(matrix.column("a").unwrap().to_vec(), vec![1.0, 2.0]);
    /// ```
    pub fn from_columns<I, S>(nrows: usize, columns: I) -> Result<Self, DedocError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let (names, data): (Vec<String>, Vec<Vec<f64>>) = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .unzip();

        let mut values = Array2::zeros((nrows, names.len()));
        for (column_id, column) in data.into_iter().enumerate() {
            if column.len() != nrows {
                return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape)).context(
                    ShapeSnafu {
                        stage: format!("feature-column-{}", names[column_id]),
                    },
                );
            }
            values
                .column_mut(column_id)
                .assign(&Array1::from(column));
        }

        Self::new(names, values)
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.position(name).map(|id| self.values.column(id))
    }

    /// Replaces a column in place; unknown names are ignored.
    pub fn map_column(&mut self, name: &str, f: impl FnOnce(ArrayView1<'_, f64>) -> Array1<f64>) {
        if let Some(id) = self.position(name) {
            let new_column = f(self.values.column(id));
            self.values.column_mut(id).assign(&new_column);
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Joins matrices with the same number of rows side by side.
    pub fn hstack(parts: Vec<FeatureMatrix>) -> Result<Self, DedocError> {
        let Some(nrows) = parts.first().map(FeatureMatrix::nrows) else {
            return Ok(Self::empty(0));
        };

        let columns = parts
            .iter()
            .flat_map(|part| part.columns.iter().cloned())
            .collect::<Vec<_>>();
        let views = parts.iter().map(|part| part.values.view()).collect::<Vec<_>>();

        let values = if views.iter().all(|view| view.nrows() == nrows) {
            concatenate(Axis(1), &views).context(ShapeSnafu { stage: "hstack" })?
        } else {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape))
                .context(ShapeSnafu { stage: "hstack" });
        };

        Self::new(columns, values)
    }

    /// Stacks per-document matrices on top of each other.
    ///
    /// The first part defines the column order; every other part must carry
    /// the same column set.
    pub fn vstack(parts: Vec<FeatureMatrix>) -> Result<Self, DedocError> {
        let Some(first) = parts.first() else {
            return Ok(Self::empty(0));
        };
        let columns = first.columns.clone();

        let conformed = parts
            .iter()
            .map(|part| part.conform_to(&columns))
            .collect::<Result<Vec<_>, _>>()?;
        let views = conformed
            .iter()
            .map(|part| part.values.view())
            .collect::<Vec<_>>();
        let values = concatenate(Axis(0), &views).context(ShapeSnafu { stage: "vstack" })?;

        Self::new(columns, values)
    }

    /// Same matrix with columns sorted by name.
    pub fn sorted(self) -> Self {
        let mut order = (0..self.columns.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| self.columns[a].cmp(&self.columns[b]));

        let columns = order.iter().map(|&id| self.columns[id].clone()).collect();
        let values = self.values.select(Axis(1), &order);
        Self { columns, values }
    }

    /// Columns `expected` has and this matrix lacks, then columns this matrix
    /// has that `expected` lacks. Both lists are sorted.
    pub fn schema_diff(&self, expected: &[String]) -> (Vec<String>, Vec<String>) {
        let own = self.columns.iter().collect::<HashSet<_>>();
        let expected_set = expected.iter().collect::<HashSet<_>>();

        let mut missing = expected
            .iter()
            .filter(|name| !own.contains(name))
            .cloned()
            .collect::<Vec<_>>();
        let mut unexpected = self
            .columns
            .iter()
            .filter(|name| !expected_set.contains(name))
            .cloned()
            .collect::<Vec<_>>();
        missing.sort();
        unexpected.sort();
        (missing, unexpected)
    }

    /// Reorders the columns to `expected`.
    ///
    /// # Errors
    /// [`DedocError::FeatureSchemaMismatch`] if the column sets differ; columns
    /// are never padded or dropped.
    pub fn conform_to(&self, expected: &[String]) -> Result<Self, DedocError> {
        let (missing, unexpected) = self.schema_diff(expected);
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(DedocError::FeatureSchemaMismatch {
                missing,
                unexpected,
            });
        }

        if self.columns == expected {
            return Ok(self.clone());
        }

        let order = expected
            .iter()
            .filter_map(|name| self.position(name))
            .collect::<Vec<_>>();
        Ok(Self {
            columns: expected.to_vec(),
            values: self.values.select(Axis(1), &order),
        })
    }

    /// Appends copies of the columns shifted from the `n_prev` previous and
    /// `n_next` next rows, named `<name>_prev_<k>` and `<name>_next_<k>`.
    ///
    /// Must be called on a single document's matrix; rows outside the document
    /// are zero.
    pub fn with_context(self, n_prev: usize, n_next: usize) -> Result<Self, DedocError> {
        let mut parts = Vec::with_capacity(1 + n_prev + n_next);

        for k in 1..=n_prev {
            let columns = self
                .columns
                .iter()
                .map(|name| format!("{}_prev_{}", name, k))
                .collect();
            parts.push(Self::new(columns, prev_line_features(&self.values, k))?);
        }
        for k in 1..=n_next {
            let columns = self
                .columns
                .iter()
                .map(|name| format!("{}_next_{}", name, k))
                .collect();
            parts.push(Self::new(columns, next_line_features(&self.values, k))?);
        }

        parts.insert(0, self);
        Self::hstack(parts)
    }
}

fn check_unique(columns: &[String]) -> Result<(), DedocError> {
    let mut seen = HashSet::with_capacity(columns.len());
    for name in columns {
        if !seen.insert(name) {
            return Err(DedocError::DuplicateFeature { name: name.clone() });
        }
    }
    Ok(())
}

/// Rows shifted `n` lines down: row `i` holds row `i - n` of the input, the
/// first `n` rows are zero.
///
/// # Example
/// ```
/// use ndarray::array;
/// use dedoc_core::features::matrix::prev_line_features;
/// let m = array![[1.0], [2.0], [3.0]];
/// assert_eq!(prev_line_features(&m, 1), array![[0.0], [1.0], [2.0]]);
/// assert_eq!(prev_line_features(&m, 5), array![[0.0], [0.0], [0.0]]);
/// ```
pub fn prev_line_features(matrix: &Array2<f64>, n: usize) -> Array2<f64> {
    let rows = matrix.nrows();
    let mut shifted = Array2::zeros(matrix.raw_dim());
    if n < rows {
        shifted
            .slice_mut(s![n.., ..])
            .assign(&matrix.slice(s![..rows - n, ..]));
    }
    shifted
}

/// Rows shifted `n` lines up: row `i` holds row `i + n` of the input, the last
/// `n` rows are zero.
pub fn next_line_features(matrix: &Array2<f64>, n: usize) -> Array2<f64> {
    let rows = matrix.nrows();
    let mut shifted = Array2::zeros(matrix.raw_dim());
    if n < rows {
        shifted
            .slice_mut(s![..rows - n, ..])
            .assign(&matrix.slice(s![n.., ..]));
    }
    shifted
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_shift_larger_than_document_is_zero() {
        let m = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(prev_line_features(&m, 3), Array2::<f64>::zeros((2, 2)));
        assert_eq!(next_line_features(&m, 3), Array2::<f64>::zeros((2, 2)));
        assert_eq!(prev_line_features(&m, 2), Array2::<f64>::zeros((2, 2)));
    }

    #[test]
    fn test_shift_directions() {
        let m = array![[1.0], [2.0], [3.0], [4.0]];
        assert_eq!(prev_line_features(&m, 2), array![[0.0], [0.0], [1.0], [2.0]]);
        assert_eq!(next_line_features(&m, 1), array![[2.0], [3.0], [4.0], [0.0]]);
        assert_eq!(prev_line_features(&m, 0), m);
    }

    #[test]
    fn test_with_context_names() {
        let matrix = FeatureMatrix::from_columns(3, vec![("bold", vec![1.0, 0.0, 1.0])]).unwrap();
        let matrix = matrix.with_context(2, 1).unwrap();
        assert_eq!(
            matrix.columns(),
            names(&["bold", "bold_prev_1", "bold_prev_2", "bold_next_1"]).as_slice()
        );
        assert_eq!(matrix.column("bold_prev_1").unwrap().to_vec(), vec![0.0, 1.0, 0.0]);
        assert_eq!(matrix.column("bold_next_1").unwrap().to_vec(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let a = FeatureMatrix::from_columns(1, vec![("x", vec![1.0])]).unwrap();
        let b = FeatureMatrix::from_columns(1, vec![("x", vec![2.0])]).unwrap();
        let err = FeatureMatrix::hstack(vec![a, b]).unwrap_err();
        assert!(matches!(err, DedocError::DuplicateFeature { name } if name == "x"));
    }

    #[test]
    fn test_column_length_checked() {
        let result = FeatureMatrix::from_columns(2, vec![("x", vec![1.0])]);
        assert!(matches!(result, Err(DedocError::Shape { .. })));
    }

    #[test]
    fn test_vstack_reorders_and_checks_schema() {
        let a = FeatureMatrix::from_columns(1, vec![("a", vec![1.0]), ("b", vec![2.0])]).unwrap();
        let b = FeatureMatrix::from_columns(1, vec![("b", vec![4.0]), ("a", vec![3.0])]).unwrap();
        let stacked = FeatureMatrix::vstack(vec![a.clone(), b]).unwrap();
        assert_eq!(stacked.values(), &array![[1.0, 2.0], [3.0, 4.0]]);

        let c = FeatureMatrix::from_columns(1, vec![("a", vec![1.0]), ("c", vec![2.0])]).unwrap();
        let err = FeatureMatrix::vstack(vec![a, c]).unwrap_err();
        match err {
            DedocError::FeatureSchemaMismatch {
                missing,
                unexpected,
            } => {
                assert_eq!(missing, names(&["b"]));
                assert_eq!(unexpected, names(&["c"]));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_sorted_columns() {
        let matrix = FeatureMatrix::from_columns(
            1,
            vec![("z", vec![1.0]), ("a", vec![2.0]), ("m", vec![3.0])],
        )
        .unwrap()
        .sorted();
        assert_eq!(matrix.columns(), names(&["a", "m", "z"]).as_slice());
        assert_eq!(matrix.values(), &array![[2.0, 3.0, 1.0]]);
    }

    #[test]
    fn test_conform_to() {
        let matrix = FeatureMatrix::from_columns(2, vec![("a", vec![1.0, 2.0]), ("b", vec![3.0, 4.0])])
            .unwrap();
        let conformed = matrix.conform_to(&names(&["b", "a"])).unwrap();
        assert_eq!(conformed.values(), &array![[3.0, 1.0], [4.0, 2.0]]);
        assert!(matrix.conform_to(&names(&["a"])).is_err());
    }

    #[test]
    fn test_hstack_row_mismatch() {
        let a = FeatureMatrix::from_columns(1, vec![("a", vec![1.0])]).unwrap();
        let b = FeatureMatrix::from_columns(2, vec![("b", vec![1.0, 2.0])]).unwrap();
        assert!(FeatureMatrix::hstack(vec![a, b]).is_err());
    }
}

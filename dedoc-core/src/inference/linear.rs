use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{
    error::{DedocError, InvalidModelSnafu},
    inference::model::{Classifier, sigmoid, softmax_rows},
};

/// Multinomial logistic regression.
///
/// `coefficients` has one row per class, or a single row for two classes
/// (the weights of the second class). Missing values count as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub classes: Vec<String>,
    pub coefficients: Array2<f64>,
    pub intercepts: Array1<f64>,
}

impl LinearModel {
    fn binary(&self) -> bool {
        self.classes.len() == 2 && self.coefficients.nrows() == 1
    }

    pub fn validate(&self) -> Result<(), DedocError> {
        let rows = self.coefficients.nrows();
        ensure!(
            self.classes.len() >= 2
                && (rows == self.classes.len() || self.binary())
                && self.intercepts.len() == rows,
            InvalidModelSnafu {
                model: "linear",
                message: format!(
                    "{} classes with {} coefficient rows and {} intercepts",
                    self.classes.len(),
                    rows,
                    self.intercepts.len()
                ),
            }
        );
        Ok(())
    }
}

impl Classifier for LinearModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>, DedocError> {
        ensure!(
            features.ncols() == self.coefficients.ncols(),
            InvalidModelSnafu {
                model: "linear",
                message: format!(
                    "{} features given, {} expected",
                    features.ncols(),
                    self.coefficients.ncols()
                ),
            }
        );

        let filled = features.mapv(|value| if value.is_nan() { 0.0 } else { value });
        let scores = filled.dot(&self.coefficients.t()) + &self.intercepts.view().insert_axis(Axis(0));

        if self.binary() {
            let positive = scores.column(0).mapv(sigmoid);
            let mut proba = Array2::zeros((features.nrows(), 2));
            proba.column_mut(1).assign(&positive);
            proba.column_mut(0).assign(&positive.mapv(|p| 1.0 - p));
            Ok(proba)
        } else {
            Ok(softmax_rows(scores))
        }
    }
}

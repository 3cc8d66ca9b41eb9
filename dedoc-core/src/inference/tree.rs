use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{
    error::{DedocError, InvalidModelSnafu},
    inference::model::{Classifier, sigmoid, softmax_rows},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// `feature < threshold` goes left, a missing (NaN) value goes to `missing`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        missing: usize,
    },
    Leaf { value: f64 },
}

/// One regression tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Output group the tree contributes to.
    #[serde(default)]
    pub class_id: usize,
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Leaf value reached by one row.
    ///
    /// A path longer than the tree only happens on a cycle, which scores 0.
    pub fn score(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node_id = 0;
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(node_id) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing,
                }) => {
                    let value = row.get(*feature).copied().unwrap_or(f64::NAN);
                    node_id = if value.is_nan() {
                        *missing
                    } else if value < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Some(TreeNode::Leaf { value }) => return *value,
                None => return 0.0,
            }
        }
        0.0
    }
}

/// Gradient boosted trees.
///
/// Two classes use one output group squashed by a sigmoid (the probability of
/// the second class); more classes use one group per class and a softmax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub classes: Vec<String>,
    pub n_features: usize,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    fn groups(&self) -> usize {
        if self.classes.len() == 2 { 1 } else { self.classes.len() }
    }

    /// Checks that every tree is acyclic and addresses known features and groups.
    ///
    /// Children must point past their parent, which also makes [`Tree::score`]
    /// terminate.
    pub fn validate(&self) -> Result<(), DedocError> {
        ensure!(
            self.classes.len() >= 2,
            InvalidModelSnafu {
                model: "tree_ensemble",
                message: format!("{} classes, at least 2 expected", self.classes.len()),
            }
        );
        for (tree_id, tree) in self.trees.iter().enumerate() {
            ensure!(
                tree.class_id < self.groups() && !tree.nodes.is_empty(),
                InvalidModelSnafu {
                    model: "tree_ensemble",
                    message: format!("tree {} is empty or has unknown class {}", tree_id, tree.class_id),
                }
            );
            for (node_id, node) in tree.nodes.iter().enumerate() {
                if let TreeNode::Split {
                    feature,
                    left,
                    right,
                    missing,
                    ..
                } = node
                {
                    let children_ok = [left, right, missing]
                        .iter()
                        .all(|&&child| child > node_id && child < tree.nodes.len());
                    ensure!(
                        children_ok && *feature < self.n_features,
                        InvalidModelSnafu {
                            model: "tree_ensemble",
                            message: format!("tree {} node {} is malformed", tree_id, node_id),
                        }
                    );
                }
            }
        }
        Ok(())
    }
}

impl Classifier for TreeEnsemble {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>, DedocError> {
        ensure!(
            features.ncols() == self.n_features,
            InvalidModelSnafu {
                model: "tree_ensemble",
                message: format!("{} features given, {} expected", features.ncols(), self.n_features),
            }
        );

        let mut margins = Array2::from_elem((features.nrows(), self.groups()), self.base_score);
        for (row, mut margin) in features.rows().into_iter().zip(margins.rows_mut()) {
            for tree in &self.trees {
                margin[tree.class_id] += tree.score(row);
            }
        }

        if self.groups() == 1 {
            let mut proba = Array2::zeros((features.nrows(), 2));
            for (mut out, margin) in proba.rows_mut().into_iter().zip(margins.column(0)) {
                let positive = sigmoid(*margin);
                out[0] = 1.0 - positive;
                out[1] = positive;
            }
            Ok(proba)
        } else {
            Ok(softmax_rows(margins))
        }
    }
}

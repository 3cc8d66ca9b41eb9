pub mod linear;
pub mod model;
pub mod tree;

pub use model::{Classifier, DecisionModel, LazyModel, ModelArtifact, ModelSource};

//! Classifier-driven line labeling.
//!
//! Both classifiers take the lines of one document as a mutable slice and
//! write their labels onto the line metadata in place.

pub mod hierarchy;
pub mod line_type;
pub mod paragraph;

pub use line_type::LineTypeClassifier;
pub use paragraph::ParagraphClassifier;

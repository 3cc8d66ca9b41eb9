pub mod analysis;
pub mod classify;
pub mod consts;
pub mod error;
pub mod features;
pub mod inference;
pub mod layout;
pub mod parse;
pub mod table;

// Re-export commonly used types
pub use classify::{LineTypeClassifier, ParagraphClassifier};
pub use error::DedocError;
pub use parse::pipeline::{Analysis, Pipeline, PipelineConfig, PipelineConfigBuilder};
pub use table::{Cell, CellSplitter, SplitterConfig};

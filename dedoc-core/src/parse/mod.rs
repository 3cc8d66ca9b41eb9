pub mod pipeline;

pub use pipeline::{Analysis, Pipeline, PipelineConfig, PipelineConfigBuilder};

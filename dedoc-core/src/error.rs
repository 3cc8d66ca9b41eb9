use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DedocError {
    #[snafu(display(
        "Invalid cell geometry: top-left ({}, {}) is after bottom-right ({}, {})",
        x_top_left,
        y_top_left,
        x_bottom_right,
        y_bottom_right
    ))]
    InvalidGeometry {
        x_top_left: i64,
        y_top_left: i64,
        x_bottom_right: i64,
        y_bottom_right: i64,
    },
    #[snafu(display(
        "Feature schema mismatch: missing columns {:?}, unexpected columns {:?}",
        missing,
        unexpected
    ))]
    FeatureSchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    #[snafu(display(
        "Annotation `{}` range [{}, {}) is outside of line with {} characters",
        name,
        start,
        end,
        len
    ))]
    InvalidAnnotation {
        name: String,
        start: usize,
        end: usize,
        len: usize,
    },
    #[snafu(display("Feature `{}` is produced more than once", name))]
    DuplicateFeature { name: String },
    #[snafu(display("Compile pattern `{}` error: {}", pattern, source))]
    Pattern {
        source: regex::Error,
        pattern: String,
    },
    #[snafu(display("Ndarray Shape error at stage `{}`: {}", stage, source))]
    Shape {
        source: ndarray::ShapeError,
        stage: String,
    },
    #[snafu(display("Load model `{}` error: {}", path, message))]
    ModelLoad { path: String, message: String },
    #[snafu(display("Read model `{}` error: {}", path, source))]
    ModelRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Write model `{}` error: {}", path, source))]
    ModelWrite {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Decode model `{}` error: {}", path, source))]
    ModelDecode {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid model `{}`: {}", model, message))]
    InvalidModel { model: String, message: String },
    #[snafu(display("Classifier `{}` returned unknown label `{}`", classifier, label))]
    UnknownLabel { classifier: String, label: String },
    #[snafu(display("Read `{}` error: {}", path, source))]
    InputRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Parse document `{}` error: {}", path, source))]
    InputDecode {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Write `{}` error: {}", path, source))]
    OutputWrite {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Invalid configuration: {}", message))]
    InvalidConfig { message: String },
    #[snafu(display("Build thread pool error: {}", source))]
    ThreadPool { source: rayon::ThreadPoolBuildError },
    #[snafu(display("Page {} failed: {}", page_no, message))]
    PageTask { page_no: usize, message: String },
}

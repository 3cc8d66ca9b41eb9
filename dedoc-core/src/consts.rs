/// Default threshold for [`crate::analysis::bbox::BBox::has_intersection_with`].
///
/// The overlap area is normalized by the area of the argument box, so a value
/// of 0.3 means "at least 30% of the other box lies inside this one".
pub const INTERSECTION_THRESHOLD: f64 = 0.3;

/// Border merge tolerance as a fraction of the smallest cell extent.
///
/// Two vertical borders are snapped together when they differ by no more than
/// `BORDER_MERGE_EPS * min(cell width)`; horizontal borders use the minimal
/// cell height the same way. Detector noise on scans is usually 1-2 px, which
/// is far below half of any real cell.
pub const BORDER_MERGE_EPS: f64 = 0.5;

/// Number of neighbouring lines on each side inspected by the list features.
pub const LIST_WINDOW_SIZE: usize = 25;

/// How many previous and next lines the line-type extractor shifts in.
pub const LINE_TYPE_CONTEXT: usize = 3;

/// Minimal document frequency of a first word to enter the vocabulary.
pub const FIRST_WORD_MIN_COUNT: usize = 3;

/// Upper bound on the first-word vocabulary size.
pub const FIRST_WORD_MAX_FEATURES: usize = 128;

/// Font size gap (above the document median) that promotes an item to a part.
pub const PART_SIZE_GAP: f64 = 2.0;

/// Environment variable overriding the directory where model artifacts are cached.
pub const MODEL_CACHE_DIR_ENV_NAME: &str = "DEDOC_MODEL_CACHE";

pub const PARAGRAPH_MODEL_FILE: &str = "paragraph_classifier.json.gz";

pub const LINE_TYPE_MODEL_FILE: &str = "tz_classifier.json.gz";

use std::collections::VecDeque;

use crate::{
    analysis::bbox::BBox,
    error::DedocError,
    features::{
        FeatureExtractor,
        list::ListFeaturesExtractor,
        matrix::FeatureMatrix,
        normalize::quantile,
        regexp::numbered_list_features,
        typography::{bold_percent, color},
    },
    layout::element::{Annotation, Line},
};

/// Columns replaced by their in-document quantile.
const QUANTILE_COLUMNS: [&str; 10] = [
    "distance_prev",
    "distance_next",
    "height",
    "height_next",
    "height_prev",
    "indent",
    "indent_right",
    "indent_prev_right",
    "indent_next",
    "indent_prev",
];

/// How many previous left borders take part in `local_order`.
const LOCAL_ORDER_DEPTH: usize = 5;

/// Geometric and textual features deciding whether a line opens a new paragraph.
///
/// Every feature that needs a box or a neighbour line is missing (NaN) when
/// there is none.
#[derive(Debug, Clone, Default)]
pub struct ParagraphFeatureExtractor {
    list_features: ListFeaturesExtractor,
}

/// Box of the line: its location, else the union of its `bounding box` annotations.
pub fn line_bbox(line: &Line) -> Option<BBox> {
    if let Some(bbox) = line.bbox() {
        return Some(bbox);
    }
    line.annotations_named(Annotation::BBOX)
        .filter_map(|annotation| serde_json::from_str::<BBox>(&annotation.value).ok())
        .reduce(|acc, bbox| acc.union(&bbox))
}

/// Share of uppercase letters among the letters of the text.
pub fn upper_letters_percent(text: &str) -> f64 {
    let (letters, upper) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(letters, upper), c| {
            (letters + 1, upper + c.is_uppercase() as usize)
        });
    if letters == 0 {
        0.0
    } else {
        upper as f64 / letters as f64
    }
}

/// Overlap of the horizontal projections divided by their union, 0 if they
/// do not overlap.
///
/// # Example
/// ```
/// use dedoc_core::analysis::bbox::BBox;
/// use dedoc_core::features::paragraph::horizontal_intersection;
/// let a = BBox::new(0, 0, 10, 5);
/// let b = BBox::new(5, 10, 10, 5);
/// assert!((horizontal_intersection(&a, &b) - 5.0 / 15.0).abs() < 1e-9);
/// assert_eq!(horizontal_intersection(&a, &BBox::new(10, 0, 5, 5)), 0.0);
/// ```
pub fn horizontal_intersection(this: &BBox, that: &BBox) -> f64 {
    if this.x_top_left >= that.x_bottom_right() || that.x_top_left >= this.x_bottom_right() {
        return 0.0;
    }
    let union_left = this.x_top_left.min(that.x_top_left);
    let union_right = this.x_bottom_right().max(that.x_bottom_right());
    let intersection_left = this.x_top_left.max(that.x_top_left);
    let intersection_right = this.x_bottom_right().min(that.x_bottom_right());
    (intersection_right - intersection_left) as f64 / (union_right - union_left) as f64
}

fn indicator(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

fn color_dispersion(line: &Line) -> f64 {
    color(line)[3].1
}

impl ParagraphFeatureExtractor {
    pub fn new(list_features: ListFeaturesExtractor) -> Self {
        Self { list_features }
    }

    /// Sorted feature matrix of one document.
    pub fn document_features(&self, lines: &[Line]) -> Result<FeatureMatrix, DedocError> {
        Ok(self.one_document(lines)?.sorted())
    }

    fn one_document(&self, lines: &[Line]) -> Result<FeatureMatrix, DedocError> {
        let bboxes = lines.iter().map(line_bbox).collect::<Vec<_>>();
        let mut local_order = VecDeque::with_capacity(LOCAL_ORDER_DEPTH);

        let mut rows = Vec::with_capacity(lines.len());
        for (line_id, line) in lines.iter().enumerate() {
            let prev = line_id.checked_sub(1).and_then(|id| lines.get(id));
            let next = lines.get(line_id + 1);
            let bbox = bboxes[line_id];
            let prev_bbox = line_id.checked_sub(1).and_then(|id| bboxes[id]);
            let next_bbox = bboxes.get(line_id + 1).copied().flatten();

            let order = match bbox {
                Some(bbox) => {
                    if local_order.len() == LOCAL_ORDER_DEPTH {
                        local_order.pop_front();
                    }
                    local_order.push_back(bbox.x_top_left);
                    let mut sorted = local_order.iter().copied().collect::<Vec<_>>();
                    sorted.sort_unstable();
                    sorted.partition_point(|&x| x < bbox.x_top_left) as f64
                }
                None => f64::NAN,
            };

            rows.push(one_line_features(line, prev, next, bbox, prev_bbox, next_bbox, order));
        }

        let columns = FEATURE_NAMES.iter().enumerate().map(|(column_id, name)| {
            (*name, rows.iter().map(|row| row[column_id]).collect::<Vec<_>>())
        });
        let mut matrix = FeatureMatrix::from_columns(lines.len(), columns)?;
        for column in QUANTILE_COLUMNS {
            matrix.map_column(column, quantile);
        }

        let (_, list_matrix) = self.list_features.one_document(lines)?;
        let list_item = FeatureMatrix::from_columns(lines.len(), [("list_item", numbered_list_features(lines))])?;
        FeatureMatrix::hstack(vec![matrix, list_matrix, list_item])
    }
}

const FEATURE_NAMES: [&str; 22] = [
    "indent",
    "indent_prev",
    "indent_next",
    "indent_right",
    "indent_prev_right",
    "intersection_next",
    "intersection_prev",
    "prev_text_lens",
    "text_lens",
    "upper_letters_percent_prev",
    "upper_letters_percent",
    "is_capitalized",
    "is_bold_changed",
    "is_bold_changed_next",
    "color_dispersion_diff",
    "distance_prev",
    "distance_next",
    "height",
    "height_next",
    "height_prev",
    "local_order",
    "text_is_empty",
];

fn one_line_features(
    line: &Line,
    prev: Option<&Line>,
    next: Option<&Line>,
    bbox: Option<BBox>,
    prev_bbox: Option<BBox>,
    next_bbox: Option<BBox>,
    local_order: f64,
) -> [f64; 22] {
    let nan = f64::NAN;
    let both = |other: Option<BBox>| bbox.zip(other);
    let full_bold = |line: &Line| bold_percent(line) == 1.0;
    let caps = upper_letters_percent(&line.text);

    [
        bbox.map_or(nan, |b| b.x_top_left as f64),
        both(prev_bbox).map_or(nan, |(b, p)| (b.x_top_left - p.x_top_left) as f64),
        both(next_bbox).map_or(nan, |(b, n)| (n.x_top_left - b.x_top_left) as f64),
        bbox.map_or(nan, |b| b.x_bottom_right() as f64),
        both(prev_bbox).map_or(nan, |(b, p)| (b.x_bottom_right() - p.x_bottom_right()) as f64),
        both(next_bbox).map_or(nan, |(b, n)| horizontal_intersection(&n, &b)),
        both(prev_bbox).map_or(nan, |(b, p)| horizontal_intersection(&p, &b)),
        prev.map_or(nan, |p| p.char_len() as f64),
        line.char_len() as f64,
        prev.map_or(nan, |p| upper_letters_percent(&p.text)),
        caps,
        indicator(caps == 1.0),
        prev.map_or(nan, |p| indicator(full_bold(line) != full_bold(p))),
        next.map_or(nan, |n| indicator(full_bold(line) != full_bold(n))),
        prev.map_or(nan, |p| (color_dispersion(p) - color_dispersion(line)).abs()),
        both(prev_bbox).map_or(nan, |(b, p)| (b.y_top_left - p.y_bottom_right()) as f64),
        both(next_bbox).map_or(nan, |(b, n)| (n.y_top_left - b.y_bottom_right()) as f64),
        bbox.map_or(nan, |b| b.height as f64),
        both(next_bbox).map_or(nan, |(b, n)| b.height as f64 / (n.height as f64 + 1.0)),
        both(prev_bbox).map_or(nan, |(b, p)| b.height as f64 / (p.height as f64 + 1.0)),
        local_order,
        indicator(line.text.trim().is_empty()),
    ]
}

impl FeatureExtractor for ParagraphFeatureExtractor {
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    fn fit(&mut self, _documents: &[Vec<Line>]) -> Result<(), DedocError> {
        Ok(())
    }

    fn transform(&self, documents: &[Vec<Line>]) -> Result<FeatureMatrix, DedocError> {
        let parts = documents
            .iter()
            .map(|document| self.one_document(document))
            .collect::<Result<Vec<_>, _>>()?;
        let matrix = if parts.is_empty() {
            self.one_document(&[])?
        } else {
            FeatureMatrix::vstack(parts)?
        };
        Ok(matrix.sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::element::LineMetadata;

    fn located(text: &str, line_id: usize, bbox: BBox) -> Line {
        Line::new(text, LineMetadata::new(0, line_id)).with_location(bbox, 0)
    }

    fn value(matrix: &FeatureMatrix, name: &str, row: usize) -> f64 {
        matrix.column(name).unwrap()[row]
    }

    #[test]
    fn test_line_bbox_from_annotations() {
        let line = Line::new("two words", LineMetadata::new(0, 0))
            .with_annotation(Annotation::new(
                0,
                3,
                Annotation::BBOX,
                r#"{"x_top_left": 10, "y_top_left": 20, "width": 30, "height": 10}"#,
            ))
            .unwrap()
            .with_annotation(Annotation::new(
                4,
                9,
                Annotation::BBOX,
                r#"{"x_top_left": 50, "y_top_left": 18, "width": 40, "height": 10}"#,
            ))
            .unwrap();
        assert_eq!(line_bbox(&line), Some(BBox::from_two_points((10, 18), (90, 30))));
        assert_eq!(line_bbox(&Line::new("", LineMetadata::new(0, 0))), None);
    }

    #[test]
    fn test_upper_letters_percent() {
        assert_eq!(upper_letters_percent("ABC 12"), 1.0);
        assert_eq!(upper_letters_percent("Ab"), 0.5);
        assert_eq!(upper_letters_percent("12"), 0.0);
    }

    #[test]
    fn test_features_of_located_lines() {
        let lines = vec![
            located("First paragraph", 0, BBox::new(120, 100, 400, 20)),
            located("continues here", 1, BBox::new(100, 125, 420, 20)),
            located("NEXT", 2, BBox::new(120, 170, 100, 30)),
        ];
        let matrix = ParagraphFeatureExtractor::default().transform(&[lines]).unwrap();

        assert_eq!(matrix.nrows(), 3);
        let mut sorted = matrix.columns().to_vec();
        sorted.sort();
        assert_eq!(matrix.columns(), sorted.as_slice());

        assert!(value(&matrix, "intersection_prev", 0).is_nan());
        assert!((value(&matrix, "intersection_prev", 1) - 400.0 / 420.0).abs() < 1e-9);
        assert_eq!(value(&matrix, "is_capitalized", 2), 1.0);
        assert_eq!(value(&matrix, "text_lens", 2), 4.0);
        assert_eq!(value(&matrix, "prev_text_lens", 1), 15.0);
        // local order: 120 is the 2nd smallest of [120, 100, 120]
        assert_eq!(value(&matrix, "local_order", 2), 1.0);

        // distance_prev is [NaN, 5, 25], the quantile puts NaN below the rest
        assert_eq!(value(&matrix, "distance_prev", 0), 1.0 / 6.0);
        assert_eq!(value(&matrix, "distance_prev", 2), 5.0 / 6.0);
    }

    #[test]
    fn test_lines_without_boxes_give_missing_columns() {
        let lines = vec![
            Line::new("", LineMetadata::new(0, 0)),
            Line::new("", LineMetadata::new(0, 1)),
        ];
        let matrix = ParagraphFeatureExtractor::default().transform(&[lines]).unwrap();
        let indent = matrix.column("indent").unwrap();
        assert!(indent.iter().all(|value| value.is_nan()));
        assert_eq!(matrix.column("text_is_empty").unwrap().to_vec(), vec![1.0, 1.0]);
    }
}

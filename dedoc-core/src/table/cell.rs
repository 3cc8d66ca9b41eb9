use serde::{Deserialize, Serialize};
use snafu::ensure;
use uuid::Uuid;

use crate::{
    analysis::bbox::BBox,
    error::{DedocError, InvalidGeometrySnafu},
};

/// One detected table cell.
///
/// Geometry is stored as four corner coordinates rather than a nested
/// [`BBox`]; `x_top_left <= x_bottom_right` and `y_top_left <= y_bottom_right`
/// always hold for a constructed cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCell")]
pub struct Cell {
    pub x_top_left: i64,
    pub x_bottom_right: i64,
    pub y_top_left: i64,
    pub y_bottom_right: i64,
    pub id_con: i64,
    pub text: String,
    pub is_attribute: bool,
    pub is_attribute_required: bool,
    pub rotated_angle: i32,
    pub uid: String,
    pub contour_coord: BBox,
    pub colspan: usize,
    pub rowspan: usize,
    pub invisible: bool,
}

/// Coordinates to replace when copying a cell; `None` keeps the source value.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellOverrides {
    pub x_top_left: Option<i64>,
    pub x_bottom_right: Option<i64>,
    pub y_top_left: Option<i64>,
    pub y_bottom_right: Option<i64>,
}

impl Cell {
    /// Creates a cell with default attributes and a fresh id.
    ///
    /// # Errors
    /// [`DedocError::InvalidGeometry`] if a top-left coordinate is greater
    /// than the matching bottom-right one.
    ///
    /// # Example
    /// ```
    /// use dedoc_core::table::cell::Cell;
    /// let cell = Cell::new(0, 10, 0, 5).unwrap();
    /// assert_eq!((cell.width(), cell.height()), (10, 5));
    /// assert!(Cell::new(10, 0, 0, 5).is_err());
    /// ```
    pub fn new(
        x_top_left: i64,
        x_bottom_right: i64,
        y_top_left: i64,
        y_bottom_right: i64,
    ) -> Result<Self, DedocError> {
        ensure!(
            x_top_left <= x_bottom_right && y_top_left <= y_bottom_right,
            InvalidGeometrySnafu {
                x_top_left,
                y_top_left,
                x_bottom_right,
                y_bottom_right,
            }
        );

        Ok(Self::empty(x_top_left, x_bottom_right, y_top_left, y_bottom_right))
    }

    /// Empty cell for callers that already hold ordered borders.
    pub(crate) fn empty(
        x_top_left: i64,
        x_bottom_right: i64,
        y_top_left: i64,
        y_bottom_right: i64,
    ) -> Self {
        debug_assert!(x_top_left <= x_bottom_right && y_top_left <= y_bottom_right);

        Self {
            x_top_left,
            x_bottom_right,
            y_top_left,
            y_bottom_right,
            id_con: -1,
            text: String::new(),
            is_attribute: false,
            is_attribute_required: false,
            rotated_angle: 0,
            uid: format!("cell_{}", Uuid::new_v4()),
            contour_coord: BBox::new(0, 0, 0, 0),
            colspan: 1,
            rowspan: 1,
            invisible: false,
        }
    }

    /// Creates a cell covering the given bounding box.
    pub fn from_bbox(bbox: BBox) -> Result<Self, DedocError> {
        Self::new(
            bbox.x_top_left,
            bbox.x_bottom_right(),
            bbox.y_top_left,
            bbox.y_bottom_right(),
        )
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attribute(mut self, is_attribute: bool, is_attribute_required: bool) -> Self {
        self.is_attribute = is_attribute;
        self.is_attribute_required = is_attribute_required;
        self
    }

    /// Copies `cell`, replacing the coordinates given in `overrides`.
    ///
    /// Text, attribute flags, rotation, contour and id are inherited. Span and
    /// visibility are *not*: the copy always starts with `colspan = rowspan = 1`
    /// and `invisible = false`, the splitter recomputes them.
    pub fn copy_from(cell: &Cell, overrides: CellOverrides) -> Result<Self, DedocError> {
        let x_top_left = overrides.x_top_left.unwrap_or(cell.x_top_left);
        let x_bottom_right = overrides.x_bottom_right.unwrap_or(cell.x_bottom_right);
        let y_top_left = overrides.y_top_left.unwrap_or(cell.y_top_left);
        let y_bottom_right = overrides.y_bottom_right.unwrap_or(cell.y_bottom_right);

        ensure!(
            x_top_left <= x_bottom_right && y_top_left <= y_bottom_right,
            InvalidGeometrySnafu {
                x_top_left,
                y_top_left,
                x_bottom_right,
                y_bottom_right,
            }
        );

        Ok(cell.resized(x_top_left, x_bottom_right, y_top_left, y_bottom_right))
    }

    /// Copy with new geometry for callers that already hold ordered borders.
    pub(crate) fn resized(
        &self,
        x_top_left: i64,
        x_bottom_right: i64,
        y_top_left: i64,
        y_bottom_right: i64,
    ) -> Self {
        debug_assert!(x_top_left <= x_bottom_right && y_top_left <= y_bottom_right);

        Self {
            x_top_left,
            x_bottom_right,
            y_top_left,
            y_bottom_right,
            id_con: self.id_con,
            text: self.text.clone(),
            is_attribute: self.is_attribute,
            is_attribute_required: self.is_attribute_required,
            rotated_angle: self.rotated_angle,
            uid: self.uid.clone(),
            contour_coord: self.contour_coord,
            colspan: 1,
            rowspan: 1,
            invisible: false,
        }
    }

    pub fn width(&self) -> i64 {
        self.x_bottom_right - self.x_top_left
    }

    pub fn height(&self) -> i64 {
        self.y_bottom_right - self.y_top_left
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_two_points(
            (self.x_top_left, self.y_top_left),
            (self.x_bottom_right, self.y_bottom_right),
        )
    }
}

/// Wire form of a cell; every field except the geometry is optional.
#[derive(Deserialize)]
struct RawCell {
    x_top_left: i64,
    x_bottom_right: i64,
    y_top_left: i64,
    y_bottom_right: i64,
    #[serde(default = "default_id_con")]
    id_con: i64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    is_attribute: bool,
    #[serde(default)]
    is_attribute_required: bool,
    #[serde(default)]
    rotated_angle: i32,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    contour_coord: Option<BBox>,
    #[serde(default = "default_span")]
    colspan: usize,
    #[serde(default = "default_span")]
    rowspan: usize,
    #[serde(default)]
    invisible: bool,
}

fn default_id_con() -> i64 {
    -1
}

fn default_span() -> usize {
    1
}

impl TryFrom<RawCell> for Cell {
    type Error = DedocError;

    fn try_from(raw: RawCell) -> Result<Self, Self::Error> {
        let mut cell = Cell::new(
            raw.x_top_left,
            raw.x_bottom_right,
            raw.y_top_left,
            raw.y_bottom_right,
        )?;
        cell.id_con = raw.id_con;
        cell.text = raw.text;
        cell.is_attribute = raw.is_attribute;
        cell.is_attribute_required = raw.is_attribute_required;
        cell.rotated_angle = raw.rotated_angle;
        if let Some(uid) = raw.uid {
            cell.uid = uid;
        }
        if let Some(contour) = raw.contour_coord {
            cell.contour_coord = contour;
        }
        cell.colspan = raw.colspan.max(1);
        cell.rowspan = raw.rowspan.max(1);
        cell.invisible = raw.invisible;
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_inverted_geometry() {
        let err = Cell::new(5, 4, 0, 1).unwrap_err();
        assert!(matches!(
            err,
            DedocError::InvalidGeometry {
                x_top_left: 5,
                x_bottom_right: 4,
                ..
            }
        ));
        assert!(Cell::new(0, 1, 3, 2).is_err());
        // degenerate but ordered geometry is allowed
        assert!(Cell::new(3, 3, 2, 2).is_ok());
    }

    #[test]
    fn test_copy_resets_span_and_visibility() {
        let mut cell = Cell::new(0, 10, 0, 10)
            .unwrap()
            .with_text("total")
            .with_attribute(true, false);
        cell.colspan = 3;
        cell.rowspan = 2;
        cell.invisible = true;
        cell.rotated_angle = 90;

        let copy = Cell::copy_from(
            &cell,
            CellOverrides {
                x_bottom_right: Some(5),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            (copy.x_top_left, copy.x_bottom_right, copy.y_top_left, copy.y_bottom_right),
            (0, 5, 0, 10)
        );
        assert_eq!(copy.text, "total");
        assert!(copy.is_attribute);
        assert_eq!(copy.rotated_angle, 90);
        assert_eq!(copy.uid, cell.uid);
        assert_eq!((copy.colspan, copy.rowspan, copy.invisible), (1, 1, false));
    }

    #[test]
    fn test_copy_with_inverted_override_fails() {
        let cell = Cell::new(0, 10, 0, 10).unwrap();
        let result = Cell::copy_from(
            &cell,
            CellOverrides {
                x_top_left: Some(11),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unique_ids() {
        let a = Cell::new(0, 1, 0, 1).unwrap();
        let b = Cell::new(0, 1, 0, 1).unwrap();
        assert_ne!(a.uid, b.uid);
        assert!(a.uid.starts_with("cell_"));
    }

    #[test]
    fn test_deserialize_validates_geometry() {
        let ok: Cell = serde_json::from_str(
            r#"{"x_top_left": 0, "x_bottom_right": 4, "y_top_left": 1, "y_bottom_right": 2, "text": "a"}"#,
        )
        .unwrap();
        assert_eq!(ok.text, "a");
        assert_eq!((ok.colspan, ok.rowspan), (1, 1));

        let bad = serde_json::from_str::<Cell>(
            r#"{"x_top_left": 5, "x_bottom_right": 4, "y_top_left": 1, "y_bottom_right": 2}"#,
        );
        assert!(bad.is_err());
    }
}

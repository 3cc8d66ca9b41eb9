use serde::{Deserialize, Serialize};

use crate::consts::INTERSECTION_THRESHOLD;

/// An axis-aligned bounding box in pixel units.
///
/// The coordinate system starts in the top-left corner of the page: `x` grows
/// to the right and `y` grows downwards, so the top-left corner is the minimal
/// point and the bottom-right corner the maximal one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub x_top_left: i64,
    pub y_top_left: i64,
    pub width: i64,
    pub height: i64,
}

impl BBox {
    /// Creates a new bounding box from its top-left corner and size.
    ///
    /// # Example
    /// ```
    /// use dedoc_core::analysis::bbox::BBox;
    /// let bbox = BBox::new(10, 20, 30, 40);
    /// assert_eq!(bbox.x_bottom_right(), 40);
    /// assert_eq!(bbox.y_bottom_right(), 60);
    /// ```
    pub fn new(x_top_left: i64, y_top_left: i64, width: i64, height: i64) -> Self {
        Self {
            x_top_left,
            y_top_left,
            width,
            height,
        }
    }

    /// Creates a bounding box from its top-left and bottom-right points.
    ///
    /// # Arguments
    /// * `top_left` - `(x, y)` of the top-left corner
    /// * `bottom_right` - `(x, y)` of the bottom-right corner
    ///
    /// # Example
    /// ```
    /// use dedoc_core::analysis::bbox::BBox;
    /// let bbox = BBox::from_two_points((1, 2), (6, 5));
    /// assert_eq!(bbox, BBox::new(1, 2, 5, 3));
    /// ```
    pub fn from_two_points(top_left: (i64, i64), bottom_right: (i64, i64)) -> Self {
        let (x_top_left, y_top_left) = top_left;
        let (x_bottom_right, y_bottom_right) = bottom_right;

        Self {
            x_top_left,
            y_top_left,
            width: x_bottom_right - x_top_left,
            height: y_bottom_right - y_top_left,
        }
    }

    pub fn x_bottom_right(&self) -> i64 {
        self.x_top_left + self.width
    }

    pub fn y_bottom_right(&self) -> i64 {
        self.y_top_left + self.height
    }

    /// Area of the box (`width * height`).
    ///
    /// # Example
    /// ```
    /// use dedoc_core::analysis::bbox::BBox;
    /// assert_eq!(BBox::new(0, 0, 4, 3).square(), 12);
    /// ```
    pub fn square(&self) -> i64 {
        self.width * self.height
    }

    /// Calculates the area of intersection between this bounding box and another.
    ///
    /// Negative overlap on either axis is clamped to zero, so disjoint or
    /// touching boxes have zero intersection.
    ///
    /// # Example
    /// ```
    /// use dedoc_core::analysis::bbox::BBox;
    /// let a = BBox::new(0, 0, 4, 4);
    /// let b = BBox::new(2, 2, 4, 4);
    /// assert_eq!(a.intersection(&b), 4);
    /// ```
    pub fn intersection(&self, other: &Self) -> i64 {
        let x_min = self.x_top_left.max(other.x_top_left);
        let y_min = self.y_top_left.max(other.y_top_left);
        let x_max = self.x_bottom_right().min(other.x_bottom_right());
        let y_max = self.y_bottom_right().min(other.y_bottom_right());

        (x_max - x_min).max(0) * (y_max - y_min).max(0)
    }

    /// Checks whether `other` lies inside this box for more than `threshold` of its area.
    ///
    /// The test is asymmetric: the intersection is normalized by the area of
    /// `other`, not by the receiver or the union. A degenerate `other` (zero
    /// area) never intersects.
    ///
    /// # Example
    /// ```
    /// use dedoc_core::analysis::bbox::BBox;
    /// let page_region = BBox::new(0, 0, 100, 100);
    /// let word = BBox::new(90, 0, 20, 10);
    /// // half of the word is inside the region
    /// assert!(page_region.has_intersection_with(&word, 0.3));
    /// // but only 5% of the region is covered by the word
    /// assert!(!word.has_intersection_with(&page_region, 0.3));
    /// ```
    pub fn has_intersection_with(&self, other: &Self, threshold: f64) -> bool {
        let other_area = other.square();
        if other_area <= 0 {
            return false;
        }

        let percent = self.intersection(other) as f64 / other_area as f64;
        percent > threshold
    }

    /// [`Self::has_intersection_with`] with the default threshold.
    pub fn intersects(&self, other: &Self) -> bool {
        self.has_intersection_with(other, INTERSECTION_THRESHOLD)
    }

    /// Smallest box containing both boxes.
    ///
    /// # Example
    /// ```
    /// use dedoc_core::analysis::bbox::BBox;
    /// let a = BBox::new(0, 0, 5, 5);
    /// let b = BBox::new(3, 3, 5, 5);
    /// assert_eq!(a.union(&b), BBox::new(0, 0, 8, 8));
    /// ```
    pub fn union(&self, other: &Self) -> Self {
        Self::from_two_points(
            (
                self.x_top_left.min(other.x_top_left),
                self.y_top_left.min(other.y_top_left),
            ),
            (
                self.x_bottom_right().max(other.x_bottom_right()),
                self.y_bottom_right().max(other.y_bottom_right()),
            ),
        )
    }

    /// Shifts the box by the given offsets.
    pub fn shift(&mut self, shift_x: i64, shift_y: i64) {
        self.x_top_left += shift_x;
        self.y_top_left += shift_y;
    }
}

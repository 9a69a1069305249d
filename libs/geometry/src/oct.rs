//! Octagons swept by 45-degree wire segments.

use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::rect::Rect;

/// The slope of an octagon's center line.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum OctDir {
    /// The high end of the center line is to the right of the low end (slope +1).
    Right,
    /// The high end of the center line is to the left of the low end (slope -1).
    Left,
}

/// The region covered by a square brush of side `2 * half_width`
/// moved along a 45-degree center line.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Oct {
    center_high: Point,
    center_low: Point,
    half_width: i64,
}

impl Oct {
    /// Creates the octagon swept between `p1` and `p2` by a wire of the given width.
    ///
    /// # Panics
    ///
    /// Panics if the segment between `p1` and `p2` is not exactly 45 degrees.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let oct = Oct::new(Point::new(0, 0), Point::new(100, 100), 10);
    /// assert_eq!(oct.dir(), OctDir::Right);
    /// assert_eq!(oct.bbox(), Rect::from_sides(-5, -5, 105, 105));
    /// ```
    pub fn new(p1: Point, p2: Point, width: i64) -> Self {
        let d = p2 - p1;
        assert!(
            d.x != 0 && d.x.abs() == d.y.abs(),
            "octagon center line must be 45 degrees: {p1:?} -> {p2:?}"
        );
        let (center_high, center_low) = if p1.y > p2.y { (p1, p2) } else { (p2, p1) };
        Self {
            center_high,
            center_low,
            half_width: width / 2,
        }
    }

    /// The upper end of the center line.
    #[inline]
    pub const fn center_high(&self) -> Point {
        self.center_high
    }

    /// The lower end of the center line.
    #[inline]
    pub const fn center_low(&self) -> Point {
        self.center_low
    }

    /// Half of the wire width.
    #[inline]
    pub const fn half_width(&self) -> i64 {
        self.half_width
    }

    /// The slope of the center line.
    pub const fn dir(&self) -> OctDir {
        if self.center_high.x < self.center_low.x {
            OctDir::Left
        } else {
            OctDir::Right
        }
    }

    /// The bounding box of the octagon.
    pub fn bbox(&self) -> Rect {
        Rect::from_corners(self.center_low, self.center_high).expand_all(self.half_width)
    }
}

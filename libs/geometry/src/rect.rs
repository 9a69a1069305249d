//! Axis-aligned boxes.

use serde::{Deserialize, Serialize};

use crate::point::Point;

/// A box stored as its lower-left and upper-right corners.
///
/// The corners are always ordered, so `left <= right` and `bot <= top`.
#[derive(
    Debug, Default, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Rect {
    ll: Point,
    ur: Point,
}

impl Rect {
    /// Creates a box from its four edges.
    ///
    /// # Panics
    ///
    /// Panics if the edges are out of order.
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let r = Rect::from_sides(10, 20, 30, 40);
    /// assert_eq!((r.width(), r.height()), (20, 20));
    /// ```
    pub fn from_sides(left: i64, bot: i64, right: i64, top: i64) -> Self {
        assert!(
            left <= right && bot <= top,
            "box edges out of order: ({left}, {bot}) ({right}, {top})"
        );
        Self {
            ll: Point::new(left, bot),
            ur: Point::new(right, top),
        }
    }

    /// Creates the box spanned by two opposite corners, given in any order.
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let r = Rect::from_corners(Point::new(30, 0), Point::new(10, 20));
    /// assert_eq!(r, Rect::from_sides(10, 0, 30, 20));
    /// ```
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            ll: Point::new(a.x.min(b.x), a.y.min(b.y)),
            ur: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// The smallest box covering every point, or [`None`] for no points.
    pub fn bbox_of(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        points
            .into_iter()
            .fold(None, |acc: Option<Self>, p| {
                Some(match acc {
                    Some(r) => Self::from_corners(
                        Point::new(r.left().min(p.x), r.bot().min(p.y)),
                        Point::new(r.right().max(p.x), r.top().max(p.y)),
                    ),
                    None => Self { ll: p, ur: p },
                })
            })
    }

    /// Lower-left corner.
    #[inline]
    pub const fn lower_left(&self) -> Point {
        self.ll
    }

    /// Upper-right corner.
    #[inline]
    pub const fn upper_right(&self) -> Point {
        self.ur
    }

    /// Minimum x.
    #[inline]
    pub const fn left(&self) -> i64 {
        self.ll.x
    }

    /// Minimum y.
    #[inline]
    pub const fn bot(&self) -> i64 {
        self.ll.y
    }

    /// Maximum x.
    #[inline]
    pub const fn right(&self) -> i64 {
        self.ur.x
    }

    /// Maximum y.
    #[inline]
    pub const fn top(&self) -> i64 {
        self.ur.y
    }

    /// Extent along x.
    #[inline]
    pub const fn width(&self) -> i64 {
        self.ur.x - self.ll.x
    }

    /// Extent along y.
    #[inline]
    pub const fn height(&self) -> i64 {
        self.ur.y - self.ll.y
    }

    /// Width times height.
    #[inline]
    pub const fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Moves the box by `offset`.
    pub fn translate(self, offset: Point) -> Self {
        Self {
            ll: self.ll + offset,
            ur: self.ur + offset,
        }
    }

    /// Pushes every edge outward by `amount`.
    pub fn expand_all(self, amount: i64) -> Self {
        Self::from_sides(
            self.left() - amount,
            self.bot() - amount,
            self.right() + amount,
            self.top() + amount,
        )
    }
}

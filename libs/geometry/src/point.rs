//! Integer points in database units.

use serde::{Deserialize, Serialize};

/// A location on the layout grid.
#[derive(
    Debug, Copy, Clone, Default, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Point {
    /// Horizontal position.
    pub x: i64,
    /// Vertical position.
    pub y: i64,
}

impl Point {
    /// Creates a point at `(x, y)`.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// The point `(0, 0)`.
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert_eq!(Point::zero(), Point::default());
    /// ```
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }
}

impl std::ops::Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

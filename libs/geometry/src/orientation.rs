//! The eight named orientations of rectangular layout objects.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::rect::Rect;

/// A named orientation, using the compass names found in placement formats.
///
/// `N` is the identity. `W`, `S` and `E` rotate counter-clockwise by 90, 180 and
/// 270 degrees. The flipped variants mirror about the y-axis first.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum NamedOrientation {
    /// No rotations or reflections.
    #[default]
    N,
    /// Rotate 90 degrees counter-clockwise.
    W,
    /// Rotate 180 degrees.
    S,
    /// Rotate 270 degrees counter-clockwise.
    E,
    /// Mirror about the y-axis.
    FN,
    /// Mirror about the y-axis, then rotate 90 degrees counter-clockwise.
    FE,
    /// Mirror about the x-axis.
    FS,
    /// Mirror about the x-axis, then rotate 90 degrees counter-clockwise.
    FW,
}

/// An error parsing a [`NamedOrientation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOrientationError(pub String);

impl Display for ParseOrientationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid orientation `{}`", self.0)
    }
}

impl std::error::Error for ParseOrientationError {}

impl NamedOrientation {
    /// All eight orientations.
    pub const ALL: [Self; 8] = [
        Self::N,
        Self::W,
        Self::S,
        Self::E,
        Self::FN,
        Self::FE,
        Self::FS,
        Self::FW,
    ];

    /// Applies this orientation to a point about the origin.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert_eq!(NamedOrientation::W.apply(Point::new(1, 2)), Point::new(-2, 1));
    /// assert_eq!(NamedOrientation::FN.apply(Point::new(1, 2)), Point::new(-1, 2));
    /// ```
    pub const fn apply(&self, p: Point) -> Point {
        let Point { x, y } = p;
        match *self {
            Self::N => Point::new(x, y),
            Self::W => Point::new(-y, x),
            Self::S => Point::new(-x, -y),
            Self::E => Point::new(y, -x),
            Self::FN => Point::new(-x, y),
            Self::FE => Point::new(-y, -x),
            Self::FS => Point::new(x, -y),
            Self::FW => Point::new(y, x),
        }
    }

    /// Applies this orientation to a rectangle about the origin.
    pub fn apply_rect(&self, rect: Rect) -> Rect {
        Rect::from_corners(self.apply(rect.lower_left()), self.apply(rect.upper_right()))
    }

    /// Returns `true` if this orientation exchanges the x and y axes.
    pub const fn swaps_axes(&self) -> bool {
        matches!(*self, Self::W | Self::E | Self::FE | Self::FW)
    }

    /// The keyword used for this orientation in text formats.
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::N => "N",
            Self::W => "W",
            Self::S => "S",
            Self::E => "E",
            Self::FN => "FN",
            Self::FE => "FE",
            Self::FS => "FS",
            Self::FW => "FW",
        }
    }
}

impl Display for NamedOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NamedOrientation {
    type Err = ParseOrientationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| ParseOrientationError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientations_preserve_rect_area() {
        let r = Rect::from_sides(0, 0, 10, 30);
        for o in NamedOrientation::ALL {
            let t = o.apply_rect(r);
            assert_eq!(t.area(), r.area());
            assert_eq!(o.swaps_axes(), t.width() == 30);
        }
    }

    #[test]
    fn parse_round_trips_names() {
        for o in NamedOrientation::ALL {
            assert_eq!(o.as_str().parse::<NamedOrientation>().unwrap(), o);
        }
        assert!("NE".parse::<NamedOrientation>().is_err());
    }
}

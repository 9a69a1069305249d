//! Integer geometry shared by the library, technology and block databases.
//!
//! Everything is measured in database units. Shapes are either axis-aligned
//! [rectangles](crate::rect::Rect), 45-degree [octagonal segments](crate::oct::Oct),
//! or rectilinear [polygons](crate::polygon::Polygon) that are split into
//! rectangles before they are stored.
//!
//! ```
//! # use geometry::prelude::*;
//! let die = Rect::from_corners(Point::new(0, 0), Point::new(2000, 1000));
//! assert_eq!(die.area(), 2_000_000);
//! ```
#![warn(missing_docs)]

extern crate self as geometry;

pub mod oct;
pub mod orientation;
pub mod point;
pub mod polygon;
pub mod prelude;
pub mod rect;

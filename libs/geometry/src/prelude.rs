//! Re-exports of the geometry types used throughout the database.

pub use crate::oct::{Oct, OctDir};
pub use crate::orientation::NamedOrientation;
pub use crate::point::Point;
pub use crate::polygon::Polygon;
pub use crate::rect::Rect;

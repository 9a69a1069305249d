//! Integer coordinate polygons.

use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::rect::Rect;

/// A simple polygon given by its vertices in order.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon with given vertices.
    pub fn from_verts(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// The polygon vertices.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The bounding box of the polygon, or [`None`] if it has no vertices.
    pub fn bbox(&self) -> Option<Rect> {
        Rect::bbox_of(self.points.iter().copied())
    }

    fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Returns `true` if every edge is horizontal or vertical.
    pub fn is_rectilinear(&self) -> bool {
        self.points.len() >= 4 && self.edges().all(|(a, b)| a.x == b.x || a.y == b.y)
    }

    /// Splits a rectilinear polygon into disjoint rectangles.
    ///
    /// The polygon is cut into horizontal slabs at every distinct vertex y-coordinate.
    /// Within a slab, the vertical edges spanning it are paired up by even-odd rule.
    /// Returns [`None`] if the polygon is not rectilinear.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let l_shape = Polygon::from_verts(vec![
    ///     Point::new(0, 0),
    ///     Point::new(20, 0),
    ///     Point::new(20, 10),
    ///     Point::new(10, 10),
    ///     Point::new(10, 20),
    ///     Point::new(0, 20),
    /// ]);
    /// let rects = l_shape.decompose_rects().unwrap();
    /// assert_eq!(rects, vec![Rect::from_sides(0, 0, 20, 10), Rect::from_sides(0, 10, 10, 20)]);
    /// ```
    pub fn decompose_rects(&self) -> Option<Vec<Rect>> {
        if !self.is_rectilinear() {
            return None;
        }
        let mut ys: Vec<i64> = self.points.iter().map(|p| p.y).collect();
        ys.sort_unstable();
        ys.dedup();

        let verticals: Vec<(i64, i64, i64)> = self
            .edges()
            .filter(|(a, b)| a.x == b.x && a.y != b.y)
            .map(|(a, b)| (a.x, a.y.min(b.y), a.y.max(b.y)))
            .collect();

        let mut rects = Vec::new();
        for slab in ys.windows(2) {
            let (lo, hi) = (slab[0], slab[1]);
            let mut xs: Vec<i64> = verticals
                .iter()
                .filter(|(_, y0, y1)| *y0 <= lo && hi <= *y1)
                .map(|(x, _, _)| *x)
                .collect();
            xs.sort_unstable();
            for pair in xs.chunks_exact(2) {
                if pair[0] < pair[1] {
                    rects.push(Rect::from_sides(pair[0], lo, pair[1], hi));
                }
            }
        }
        Some(rects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_decomposes_to_itself() {
        let p = Polygon::from_verts(vec![
            Point::new(0, 0),
            Point::new(0, 5),
            Point::new(7, 5),
            Point::new(7, 0),
        ]);
        assert_eq!(p.decompose_rects().unwrap(), vec![Rect::from_sides(0, 0, 7, 5)]);
        assert_eq!(p.bbox(), Some(Rect::from_sides(0, 0, 7, 5)));
    }

    #[test]
    fn u_shape_decomposes_into_three() {
        let p = Polygon::from_verts(vec![
            Point::new(0, 0),
            Point::new(30, 0),
            Point::new(30, 20),
            Point::new(20, 20),
            Point::new(20, 10),
            Point::new(10, 10),
            Point::new(10, 20),
            Point::new(0, 20),
        ]);
        let rects = p.decompose_rects().unwrap();
        let area: i64 = rects.iter().map(|r| r.area()).sum();
        assert_eq!(area, 30 * 10 + 2 * 10 * 10);
        assert_eq!(rects.len(), 3);
    }

    #[test]
    fn diagonal_edges_are_rejected() {
        let tri = Polygon::from_verts(vec![Point::new(0, 0), Point::new(10, 0), Point::new(0, 10)]);
        assert!(tri.decompose_rects().is_none());
    }
}

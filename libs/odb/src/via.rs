//! Via geometry shared by technology and block vias.

use geometry::prelude::*;

use crate::id::Id;
use crate::stream::persist_fields;
use crate::tech::TechLayer;

/// One shape of a via.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ViaBox {
    pub layer: Id<TechLayer>,
    pub rect: Rect,
}

persist_fields!(ViaBox { layer, rect });

/// The parameters of a via generated from a via rule.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ViaParams {
    pub cut_size: (i64, i64),
    pub cut_spacing: (i64, i64),
    pub bot_enclosure: (i64, i64),
    pub top_enclosure: (i64, i64),
    pub num_rows: u32,
    pub num_cols: u32,
    /// The center of the cut array.
    pub origin: Point,
    pub bot_offset: Point,
    pub top_offset: Point,
    pub bottom_layer: Id<TechLayer>,
    pub cut_layer: Id<TechLayer>,
    pub top_layer: Id<TechLayer>,
}

persist_fields!(ViaParams {
    cut_size,
    cut_spacing,
    bot_enclosure,
    top_enclosure,
    num_rows,
    num_cols,
    origin,
    bot_offset,
    top_offset,
    bottom_layer,
    cut_layer,
    top_layer,
});

impl ViaParams {
    /// Creates parameters for a single cut with no enclosure.
    pub fn new(
        bottom_layer: Id<TechLayer>,
        cut_layer: Id<TechLayer>,
        top_layer: Id<TechLayer>,
        cut_size: (i64, i64),
    ) -> Self {
        Self {
            cut_size,
            cut_spacing: (0, 0),
            bot_enclosure: (0, 0),
            top_enclosure: (0, 0),
            num_rows: 1,
            num_cols: 1,
            origin: Point::zero(),
            bot_offset: Point::zero(),
            top_offset: Point::zero(),
            bottom_layer,
            cut_layer,
            top_layer,
        }
    }

    /// The bounding box of the cut array.
    pub fn cut_bbox(&self) -> Rect {
        let rows = self.num_rows.max(1) as i64;
        let cols = self.num_cols.max(1) as i64;
        let w = cols * self.cut_size.0 + (cols - 1) * self.cut_spacing.0;
        let h = rows * self.cut_size.1 + (rows - 1) * self.cut_spacing.1;
        let left = self.origin.x - w / 2;
        let bot = self.origin.y - h / 2;
        Rect::from_sides(left, bot, left + w, bot + h)
    }

    /// Generates the via's shapes: the bottom enclosure, each cut row by row,
    /// then the top enclosure.
    pub fn boxes(&self) -> Vec<ViaBox> {
        let cuts = self.cut_bbox();
        let enclosure = |(ex, ey): (i64, i64), offset: Point| {
            Rect::from_sides(
                cuts.left() - ex,
                cuts.bot() - ey,
                cuts.right() + ex,
                cuts.top() + ey,
            )
            .translate(offset)
        };

        let mut boxes = Vec::with_capacity((self.num_rows * self.num_cols) as usize + 2);
        boxes.push(ViaBox {
            layer: self.bottom_layer,
            rect: enclosure(self.bot_enclosure, self.bot_offset),
        });
        let (cx, cy) = self.cut_size;
        let (sx, sy) = self.cut_spacing;
        for row in 0..self.num_rows.max(1) as i64 {
            for col in 0..self.num_cols.max(1) as i64 {
                let left = cuts.left() + col * (cx + sx);
                let bot = cuts.bot() + row * (cy + sy);
                boxes.push(ViaBox {
                    layer: self.cut_layer,
                    rect: Rect::from_sides(left, bot, left + cx, bot + cy),
                });
            }
        }
        boxes.push(ViaBox {
            layer: self.top_layer,
            rect: enclosure(self.top_enclosure, self.top_offset),
        });
        boxes
    }
}

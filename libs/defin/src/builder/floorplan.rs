//! DIEAREA, ROW, TRACKS and GCELLGRID.
//!
//! An import that does not create the block replaces the rows, tracks and
//! gcell grid of the block with those of the file, starting at the first
//! statement of each kind.

use geometry::prelude::*;
use lefdef::def::{Axis, CallbackResult, DieArea, GcellGrid, Row, Tracks};
use odb::block::{self, GridPattern, PropTarget, RowDirection};
use odb::{Block, Id};

use crate::base::{Session, Units};
use crate::issue::IssueKind;

#[derive(Debug, Default)]
pub(crate) struct FloorplanBuilder {
    rows_replaced: bool,
    tracks_replaced: bool,
    gcells_replaced: bool,
    rows: usize,
    tracks: usize,
}

fn pattern(units: &Units, start: i64, num: u32, step: i64, mask: Option<u32>) -> GridPattern {
    GridPattern {
        start: units.dbdist(start),
        num,
        step: units.dbdist(step),
        first_mask: mask.unwrap_or(0),
    }
}

impl FloorplanBuilder {
    pub fn die_area(&mut self, s: &mut Session<'_>, block: Id<Block>, area: DieArea) -> CallbackResult {
        let pts: Vec<Point> = area.pts.iter().map(|&pt| s.units.point(pt)).collect();
        let polygon = match pts.as_slice() {
            [a, b] => {
                let r = Rect::from_corners(*a, *b);
                Polygon::from_verts(vec![
                    r.lower_left(),
                    Point::new(r.right(), r.bot()),
                    r.upper_right(),
                    Point::new(r.left(), r.top()),
                ])
            }
            [_, _, _, ..] => Polygon::from_verts(pts),
            _ => {
                s.report(136, IssueKind::Invalid, "DIEAREA needs at least two points");
                return Ok(());
            }
        };
        s.db.block_mut(block).die_area = polygon;
        Ok(())
    }

    pub fn row(&mut self, s: &mut Session<'_>, block: Id<Block>, row: Row) -> CallbackResult {
        if !s.policy.create && !self.rows_replaced {
            self.rows_replaced = true;
            let b = s.db.block_mut(block);
            let old: Vec<_> = b.rows().map(|(id, _)| id).collect();
            for id in old {
                b.destroy_row(id);
            }
        }
        let Some(site) = s.find_site(&row.site) else {
            return Ok(());
        };
        let (direction, num_sites, spacing) = match (row.num_x, row.num_y) {
            (x, 1) => (RowDirection::Horizontal, x, row.step_x),
            (1, y) => (RowDirection::Vertical, y, row.step_y),
            _ => {
                return s.unsupported(
                    137,
                    format!("row {} has more than one site in both directions", row.name),
                );
            }
        };
        let id = s.db.block_mut(block).create_row(block::Row {
            name: row.name,
            site,
            origin: s.units.point(row.origin),
            orient: row.orient,
            direction,
            num_sites,
            spacing: s.units.dbdist(spacing),
        });
        self.rows += 1;
        if s.policy.create {
            s.add_properties(block, PropTarget::Row, id.into(), &row.properties);
        }
        Ok(())
    }

    pub fn tracks(&mut self, s: &mut Session<'_>, block: Id<Block>, tracks: Tracks) -> CallbackResult {
        if !s.policy.create && !self.tracks_replaced {
            self.tracks_replaced = true;
            let b = s.db.block_mut(block);
            let old: Vec<_> = b.track_grids().map(|(id, _)| id).collect();
            for id in old {
                b.destroy_track_grid(id);
            }
        }
        let p = pattern(&s.units, tracks.start, tracks.num, tracks.step, tracks.mask);
        for name in &tracks.layers {
            let Some(layer) = s.find_layer(name) else {
                continue;
            };
            let b = s.db.block_mut(block);
            let Some(grid) = b
                .find_track_grid(layer)
                .or_else(|| b.create_track_grid(layer))
            else {
                continue;
            };
            let grid = b.track_grid_mut(grid);
            match tracks.axis {
                Axis::X => grid.x.push(p),
                Axis::Y => grid.y.push(p),
            }
            self.tracks += 1;
        }
        Ok(())
    }

    pub fn gcell_grid(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        grid: GcellGrid,
    ) -> CallbackResult {
        let b = s.db.block_mut(block);
        if !s.policy.create && !self.gcells_replaced {
            self.gcells_replaced = true;
            b.clear_gcell_grid();
        }
        let p = pattern(&s.units, grid.start, grid.num, grid.step, None);
        let g = b.gcell_grid_mut();
        match grid.axis {
            Axis::X => g.x.push(p),
            Axis::Y => g.y.push(p),
        }
        Ok(())
    }

    pub fn end(&self) {
        if self.rows > 0 {
            tracing::info!("    Created {} rows", self.rows);
        }
        if self.tracks > 0 {
            tracing::info!("    Created {} track patterns", self.tracks);
        }
    }
}

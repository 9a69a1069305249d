//! VIAS.

use geometry::prelude::*;
use lefdef::def::{self, Abort, CallbackResult, LayerGeometry, ViaDef, ViaRuleVia};
use odb::block::Via;
use odb::via::{ViaBox, ViaParams};
use odb::{Block, Id};

use crate::base::Session;
use crate::issue::IssueKind;

#[derive(Debug, Default)]
pub(crate) struct ViaBuilder {
    created: usize,
}

impl ViaBuilder {
    pub fn build(&mut self, s: &mut Session<'_>, block: Id<Block>, via: def::Via) -> CallbackResult {
        if s.db.block(block).find_via(&via.name).is_some() {
            if s.policy.merge {
                return Ok(());
            }
            s.report(
                190,
                IssueKind::Invalid,
                format!("duplicate via {}", via.name),
            );
            return Ok(());
        }
        let created = match &via.def {
            ViaDef::Fixed(shapes) => {
                let Some(boxes) = Self::boxes(s, shapes)? else {
                    return Ok(());
                };
                s.db.block_mut(block).create_via(&via.name, boxes)
            }
            ViaDef::ViaRule(rule) => self.rule_via(s, block, &via.name, rule),
        };
        if created.is_some() {
            self.created += 1;
        }
        Ok(())
    }

    /// The shapes of a fixed via, or `None` if a layer is undefined.
    fn boxes(
        s: &mut Session<'_>,
        shapes: &[LayerGeometry],
    ) -> Result<Option<Vec<ViaBox>>, Abort> {
        let mut boxes = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let Some(layer) = s.find_layer(&shape.layer) else {
                return Ok(None);
            };
            for rect in s.geometry_rects(&shape.geometry)? {
                boxes.push(ViaBox { layer, rect });
            }
        }
        Ok(Some(boxes))
    }

    fn rule_via(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        name: &str,
        via: &ViaRuleVia,
    ) -> Option<Id<Via>> {
        let rule = s.tech().find_via_rule(&via.rule);
        if rule.is_none() {
            s.report(
                191,
                IssueKind::Referential,
                format!("undefined via rule {}", via.rule),
            );
            return None;
        }
        let bot = s.find_layer(&via.bot_layer)?;
        let cut = s.find_layer(&via.cut_layer)?;
        let top = s.find_layer(&via.top_layer)?;

        let u = s.units;
        let pair = |(x, y): (i64, i64)| (u.dbdist(x), u.dbdist(y));
        let mut params = ViaParams::new(bot, cut, top, pair(via.cut_size));
        params.cut_spacing = pair(via.cut_spacing);
        let (bx, by, tx, ty) = via.enclosure;
        params.bot_enclosure = pair((bx, by));
        params.top_enclosure = pair((tx, ty));
        if let Some((rows, cols)) = via.rowcol {
            params.num_rows = rows;
            params.num_cols = cols;
        }
        if let Some(origin) = via.origin {
            params.origin = u.point(origin);
        }
        if let Some((bx, by, tx, ty)) = via.offset {
            params.bot_offset = u.point(Point::new(bx, by));
            params.top_offset = u.point(Point::new(tx, ty));
        }

        let b = s.db.block_mut(block);
        let id = b.create_rule_via(name, rule, params)?;
        b.via_mut(id).pattern = via.pattern.clone();
        Some(id)
    }

    pub fn end(&self) {
        if self.created > 0 {
            tracing::info!("    Created {} vias", self.created);
        }
    }
}

//! BLOCKAGES and FILLS.

use lefdef::def::{
    Blockage, CallbackResult, Fill, LayerBlockage, LayerBlockageSpacing, PlacementBlockage,
    PlacementBlockageKind,
};
use odb::{Block, Id};

use crate::base::Session;

#[derive(Debug, Default)]
pub(crate) struct BlockageBuilder {
    obstructions: usize,
    blockages: usize,
    fills: usize,
}

impl BlockageBuilder {
    pub fn blockage(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        blockage: Blockage,
    ) -> CallbackResult {
        match blockage {
            Blockage::Layer(b) => self.layer(s, block, b),
            Blockage::Placement(b) => self.placement(s, block, b),
        }
    }

    fn layer(&mut self, s: &mut Session<'_>, block: Id<Block>, b: LayerBlockage) -> CallbackResult {
        let Some(layer) = s.find_layer(&b.layer) else {
            return Ok(());
        };
        let inst = match &b.component {
            Some(name) => match s.find_component(block, name) {
                Some(inst) => Some(inst),
                None => return Ok(()),
            },
            None => None,
        };
        let (min_spacing, effective_width) = match b.spacing {
            Some(LayerBlockageSpacing::Spacing(v)) => (Some(s.units.dbdist(v)), None),
            Some(LayerBlockageSpacing::DesignRuleWidth(v)) => (None, Some(s.units.dbdist(v))),
            None => (None, None),
        };
        for geometry in &b.geometry {
            for rect in s.geometry_rects(geometry)? {
                let blk = s.db.block_mut(block);
                let id = blk.create_obstruction(layer, rect);
                let o = blk.obstruction_mut(id);
                o.inst = inst;
                o.slot = b.slots;
                o.fill = b.fills;
                o.pushed_down = b.pushdown;
                o.except_pg_net = b.except_pg_net;
                o.min_spacing = min_spacing;
                o.effective_width = effective_width;
                o.mask = b.mask.unwrap_or(0);
                self.obstructions += 1;
            }
        }
        Ok(())
    }

    fn placement(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        b: PlacementBlockage,
    ) -> CallbackResult {
        let inst = match &b.component {
            Some(name) => match s.find_component(block, name) {
                Some(inst) => Some(inst),
                None => return Ok(()),
            },
            None => None,
        };
        for geometry in &b.geometry {
            for rect in s.geometry_rects(geometry)? {
                let blk = s.db.block_mut(block);
                let id = blk.create_blockage(rect);
                let p = blk.blockage_mut(id);
                p.inst = inst;
                p.pushed_down = b.pushdown;
                match b.kind {
                    Some(PlacementBlockageKind::Soft) => p.soft = true,
                    Some(PlacementBlockageKind::Partial(density)) => p.max_density = density,
                    None => {}
                }
                self.blockages += 1;
            }
        }
        Ok(())
    }

    pub fn fill(&mut self, s: &mut Session<'_>, block: Id<Block>, fill: Fill) -> CallbackResult {
        match fill {
            Fill::Layer {
                layer,
                mask,
                opc,
                geometry,
            } => {
                let Some(layer) = s.find_layer(&layer) else {
                    return Ok(());
                };
                for shape in &geometry {
                    for rect in s.geometry_rects(shape)? {
                        s.db.block_mut(block)
                            .create_fill(layer, rect, mask.unwrap_or(0), opc);
                        self.fills += 1;
                    }
                }
                Ok(())
            }
            Fill::Via { via, .. } => s.unsupported(220, format!("via fill {via}")),
        }
    }

    pub fn end(&self) {
        if self.obstructions > 0 {
            tracing::info!("    Created {} layer blockages", self.obstructions);
        }
        if self.blockages > 0 {
            tracing::info!("    Created {} placement blockages", self.blockages);
        }
        if self.fills > 0 {
            tracing::info!("    Created {} fills", self.fills);
        }
    }
}

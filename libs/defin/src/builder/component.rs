//! COMPONENTS.

use lefdef::def::{CallbackResult, Component};
use odb::block::{Inst, PropTarget};
use odb::{Block, Id};

use crate::base::{self, Session};
use crate::issue::IssueKind;

#[derive(Debug, Default)]
pub(crate) struct ComponentBuilder {
    created: usize,
    updated: usize,
}

impl ComponentBuilder {
    pub fn build(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        comp: Component,
    ) -> CallbackResult {
        let inst = match s.find_inst(block, &comp.name) {
            Some(inst) if s.policy.merge => {
                let master = s.db.block(block).inst(inst).master;
                let model = &s.db.lib(master.lib).master(master.master).name;
                if *model != comp.model {
                    let message = format!(
                        "component {} is an instance of {model}, not {}",
                        comp.name, comp.model
                    );
                    s.report(141, IssueKind::Invalid, message);
                    return Ok(());
                }
                self.updated += 1;
                inst
            }
            Some(_) => {
                s.report(
                    140,
                    IssueKind::Invalid,
                    format!("duplicate component {}", comp.name),
                );
                return Ok(());
            }
            None if s.policy.create => {
                let Some(master) = s.find_master(&comp.model) else {
                    return Ok(());
                };
                let Some(inst) = s.db.create_inst(block, &comp.name, master) else {
                    s.report(
                        140,
                        IssueKind::Invalid,
                        format!("duplicate component {}", comp.name),
                    );
                    return Ok(());
                };
                self.created += 1;
                inst
            }
            None => {
                s.report(
                    144,
                    IssueKind::ModeMismatch,
                    format!("component {} does not exist", comp.name),
                );
                return Ok(());
            }
        };

        if let Some(placement) = &comp.placement {
            let status = base::placement_status(placement);
            let location = placement
                .location()
                .map(|(pt, orient)| (s.units.point(pt), orient));
            let i = s.db.block_mut(block).inst_mut(inst);
            i.status = status;
            if let Some((origin, orient)) = location {
                i.set_location(origin, orient);
            }
        }
        if s.policy.create {
            self.attributes(s, block, inst, &comp)?;
        }
        Ok(())
    }

    fn attributes(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        inst: Id<Inst>,
        comp: &Component,
    ) -> CallbackResult {
        if comp.mask_shift.is_some() {
            s.unsupported(142, format!("MASKSHIFT of component {}", comp.name))?;
        }
        if comp.route_halo.is_some() {
            s.unsupported(143, format!("ROUTEHALO of component {}", comp.name))?;
        }
        let region = match &comp.region {
            Some(name) => {
                let region = s.db.block(block).find_region(name);
                if region.is_none() {
                    s.report(
                        115,
                        IssueKind::Referential,
                        format!("undefined region {name}"),
                    );
                }
                region
            }
            None => None,
        };
        let halo = comp.halo.as_ref().map(|h| {
            (
                s.units.dbdist(h.left),
                s.units.dbdist(h.bottom),
                s.units.dbdist(h.right),
                s.units.dbdist(h.top),
            )
        });

        let i = s.db.block_mut(block).inst_mut(inst);
        if let Some(source) = comp.source {
            i.source = base::source(source);
        }
        if let Some(weight) = comp.weight {
            i.weight = weight as i32;
        }
        if region.is_some() {
            i.region = region;
        }
        if halo.is_some() {
            i.halo = halo;
        }
        s.add_properties(block, PropTarget::Component, inst.into(), &comp.properties);
        Ok(())
    }

    pub fn end(&self) {
        if self.created > 0 {
            tracing::info!("    Created {} components", self.created);
        }
        if self.updated > 0 {
            tracing::info!("    Updated {} components", self.updated);
        }
    }
}

//! PINS and PINPROPERTIES.

use geometry::prelude::*;
use lefdef::def::{CallbackResult, Pin, PinPort, PinProperties};
use odb::block::{BTerm, NetFlags, PinBox, PropTarget};
use odb::object::ObjectRef;
use odb::{Block, Id};

use crate::base::{self, Session};
use crate::issue::IssueKind;

#[derive(Debug, Default)]
pub(crate) struct PinBuilder {
    created: usize,
    updated: usize,
    ports: usize,
}

impl PinBuilder {
    pub fn build(&mut self, s: &mut Session<'_>, block: Id<Block>, pin: Pin) -> CallbackResult {
        let existing = s.db.block(block).find_bterm(&pin.name);
        let bterm = match existing {
            Some(bterm) if s.policy.merge => {
                self.updated += 1;
                bterm
            }
            Some(_) => {
                s.report(
                    150,
                    IssueKind::Invalid,
                    format!("duplicate pin {}", pin.name),
                );
                return Ok(());
            }
            None if s.policy.create => match self.create(s, block, &pin) {
                Some(bterm) => bterm,
                None => return Ok(()),
            },
            None => {
                s.report(
                    151,
                    IssueKind::ModeMismatch,
                    format!("pin {} does not exist", pin.name),
                );
                return Ok(());
            }
        };
        s.touch_bterm(block, bterm);

        if s.policy.create {
            let b = s.db.block_mut(block).bterm_mut(bterm);
            if let Some(direction) = pin.direction {
                b.io_type = base::io_type(direction);
            }
            if let Some(net_use) = pin.net_use {
                b.sig_type = base::sig_type(net_use);
            }
        }
        if pin.ports.is_empty() {
            return Ok(());
        }
        if existing.is_some() {
            // A pin given again replaces its ports.
            s.db.block_mut(block).destroy_bpins(bterm);
        }
        for port in &pin.ports {
            self.port(s, block, bterm, port)?;
        }
        Ok(())
    }

    fn create(&mut self, s: &mut Session<'_>, block: Id<Block>, pin: &Pin) -> Option<Id<BTerm>> {
        if pin.net.is_empty() {
            s.report(
                152,
                IssueKind::Invalid,
                format!("pin {} has no NET", pin.name),
            );
            return None;
        }
        let net = match s.find_net(block, &pin.net) {
            Some(net) => net,
            None => s.db.block_mut(block).create_net(&pin.net)?,
        };
        s.touch_net(block, net);
        if pin.special {
            s.db.block_mut(block).net_mut(net).flags |= NetFlags::SPECIAL;
        }
        let bterm = s.db.block_mut(block).create_bterm(net, &pin.name);
        if bterm.is_some() {
            self.created += 1;
        }
        bterm
    }

    fn port(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        bterm: Id<BTerm>,
        port: &PinPort,
    ) -> CallbackResult {
        let status = port
            .placement
            .as_ref()
            .map(base::placement_status)
            .unwrap_or_default();
        let (origin, orient) = port
            .placement
            .as_ref()
            .and_then(|p| p.location())
            .map(|(pt, orient)| (s.units.point(pt), orient))
            .unwrap_or((Point::zero(), NamedOrientation::N));
        let place = |rect: Rect| orient.apply_rect(rect).translate(origin);

        let mut boxes = Vec::new();
        for shape in &port.shapes {
            let Some(layer) = s.find_layer(&shape.layer) else {
                continue;
            };
            for rect in s.geometry_rects(&shape.geometry)? {
                boxes.push(PinBox {
                    layer,
                    rect: place(rect),
                    mask: shape.mask.unwrap_or(0),
                });
            }
        }
        for via in &port.vias {
            let Some(v) = s.find_via(block, &via.name) else {
                continue;
            };
            let at = s.units.point(via.pt);
            let b = s.db.block(block);
            boxes.extend(v.boxes(s.db.tech(s.tech), b).iter().map(|vb| PinBox {
                layer: vb.layer,
                rect: place(vb.rect.translate(at)),
                mask: via.mask.unwrap_or(0),
            }));
        }

        let b = s.db.block_mut(block);
        let bpin = b.create_bpin(bterm);
        let p = b.bpin_mut(bpin);
        p.status = status;
        p.boxes = boxes;
        self.ports += 1;
        Ok(())
    }

    pub fn properties(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        props: PinProperties,
    ) -> CallbackResult {
        let obj: ObjectRef = if base::is_io_pin(&props.component) {
            let Some(bterm) = s.db.block(block).find_bterm(&props.pin) else {
                s.report(
                    119,
                    IssueKind::Referential,
                    format!("undefined pin {}", props.pin),
                );
                return Ok(());
            };
            s.touch_bterm(block, bterm);
            bterm.into()
        } else {
            let Some(inst) = s.find_component(block, &props.component) else {
                return Ok(());
            };
            let Some(iterm) = s.find_iterm(block, inst, &props.pin) else {
                return Ok(());
            };
            iterm.into()
        };
        s.add_properties(block, PropTarget::ComponentPin, obj, &props.properties);
        Ok(())
    }

    pub fn end(&self) {
        if self.created > 0 {
            tracing::info!("    Created {} pins", self.created);
        }
        if self.updated > 0 {
            tracing::info!("    Updated {} pins", self.updated);
        }
        tracing::debug!(ports = self.ports, "pin ports read");
    }
}

//! SPECIALNETS: connections, attributes and special wiring.

use std::collections::HashSet;

use geometry::prelude::*;
use lefdef::def::{
    self, CallbackResult, GeometrySpecialWiring, NetPin, Path, PathElem, RoutingStatus,
    SpecialNet, SpecialShape, SpecialWiring,
};
use odb::block::{create_box, Net, NetFlags, PropTarget, SBoxShape, SWire, ViaRef, WireShapeType};
use odb::tech::TechLayer;
use odb::{Block, Id};

use crate::base::{self, Session};
use crate::issue::IssueKind;

#[derive(Debug, Default)]
pub(crate) struct SNetBuilder {
    /// Nets whose special wiring this import replaced.
    wired: HashSet<Id<Net>>,
    created: usize,
    nets: usize,
    connections: usize,
    sboxes: usize,
}

impl SNetBuilder {
    pub fn build(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        snet: SpecialNet,
    ) -> CallbackResult {
        let net = match s.find_net(block, &snet.name) {
            Some(net) => net,
            None if s.policy.create => match s.db.block_mut(block).create_net(&snet.name) {
                Some(net) => {
                    self.created += 1;
                    net
                }
                None => return Ok(()),
            },
            None => {
                s.report(
                    180,
                    IssueKind::ModeMismatch,
                    format!("special net {} does not exist", snet.name),
                );
                return Ok(());
            }
        };
        s.touch_net(block, net);
        self.nets += 1;

        if s.policy.connections {
            for conn in &snet.connections {
                self.connection(s, block, net, conn);
            }
        }
        if s.policy.create {
            let n = s.db.block_mut(block).net_mut(net);
            n.flags |= NetFlags::SPECIAL;
            n.flags.set(NetFlags::FIXED_BUMP, snet.fixed_bump);
            if let Some(net_use) = snet.net_use {
                n.sig_type = base::sig_type(net_use);
            }
            if let Some(source) = snet.source {
                n.source = base::source(source);
            }
            if let Some(weight) = snet.weight {
                n.weight = weight as i32;
            }
            s.add_properties(block, PropTarget::SpecialNet, net.into(), &snet.properties);
        }
        if s.policy.wiring && !s.opts.skip_special_wires {
            if self.wired.insert(net) {
                s.db.block_mut(block).destroy_swires(net);
            }
            for wiring in &snet.wiring {
                match wiring {
                    SpecialWiring::Path(wiring) => {
                        if wiring.paths.iter().all(|path| Self::skip_path(s, path)) {
                            continue;
                        }
                        let Some(swire) = self.swire(s, block, net, &wiring.status) else {
                            continue;
                        };
                        for path in &wiring.paths {
                            self.path(s, block, swire, path)?;
                        }
                    }
                    SpecialWiring::Geometry(wiring) => self.shape(s, block, net, wiring)?,
                }
            }
        }
        Ok(())
    }

    fn connection(&mut self, s: &mut Session<'_>, block: Id<Block>, net: Id<Net>, conn: &NetPin) {
        if conn.component == "*" {
            self.connect_all(s, block, net, &conn.pin);
            return;
        }
        if base::is_io_pin(&conn.component) {
            match s.db.block(block).find_bterm(&conn.pin) {
                Some(bterm) => s.db.block_mut(block).connect_bterm(bterm, net),
                None if s.policy.create => {
                    s.db.block_mut(block).create_bterm(net, &conn.pin);
                }
                None => {
                    s.report(
                        161,
                        IssueKind::Referential,
                        format!("undefined pin {}", conn.pin),
                    );
                    return;
                }
            }
        } else {
            let Some(inst) = s.find_component(block, &conn.component) else {
                return;
            };
            let Some(iterm) = s.find_iterm(block, inst, &conn.pin) else {
                return;
            };
            s.db.block_mut(block).connect_iterm(iterm, net);
        }
        self.connections += 1;
    }

    /// Connects the pin named `pin` of every component that has one.
    fn connect_all(&mut self, s: &mut Session<'_>, block: Id<Block>, net: Id<Net>, pin: &str) {
        let b = s.db.block(block);
        let iterms: Vec<_> = b
            .insts()
            .filter_map(|(inst, i)| {
                let mterm = s.db.lib(i.master.lib).find_mterm(i.master.master, pin)?;
                b.find_iterm(inst, mterm)
            })
            .collect();
        let b = s.db.block_mut(block);
        for &iterm in &iterms {
            b.connect_iterm(iterm, net);
        }
        b.net_mut(net).flags |= NetFlags::WILD_CONNECTED;
        self.connections += iterms.len();
    }

    /// Starts a special wire for one wiring statement.
    fn swire(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        net: Id<Net>,
        status: &RoutingStatus,
    ) -> Option<Id<SWire>> {
        let shield = match status {
            RoutingStatus::Shield(_) if s.opts.skip_shields => return None,
            RoutingStatus::Shield(name) => match s.find_net(block, name) {
                Some(shield) => Some(shield),
                None => {
                    s.report(
                        118,
                        IssueKind::Referential,
                        format!("undefined shielded net {name}"),
                    );
                    return None;
                }
            },
            _ => None,
        };
        let swire = s
            .db
            .block_mut(block)
            .create_swire(net, base::wire_type(status), shield);
        s.touch_swire(swire);
        Some(swire)
    }

    fn skip_shape(s: &Session<'_>, shape: WireShapeType) -> bool {
        match shape {
            WireShapeType::BlockWire => s.opts.skip_block_wires,
            WireShapeType::FillWire | WireShapeType::FillWireOpc => s.opts.skip_fill_wires,
            _ => false,
        }
    }

    /// Whether a path is dropped by the shape given before its first point.
    fn skip_path(s: &Session<'_>, path: &Path) -> bool {
        path.elems
            .iter()
            .take_while(|elem| !matches!(elem, PathElem::Point { .. }))
            .any(|elem| {
                matches!(elem, PathElem::Shape(t) if Self::skip_shape(s, base::wire_shape(*t)))
            })
    }

    fn path(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        swire: Id<SWire>,
        path: &Path,
    ) -> CallbackResult {
        let mut layer: Option<Id<TechLayer>> = None;
        let mut width = 0;
        let mut shape = WireShapeType::None;
        let mut mask = 0;
        let mut prev: Option<(Point, Option<i64>)> = None;

        for elem in &path.elems {
            match elem {
                PathElem::Layer(name) => {
                    layer = s.find_layer(name);
                    if layer.is_none() {
                        return Ok(());
                    }
                }
                PathElem::Width(w) => width = s.units.dbdist(*w),
                PathElem::Shape(t) => {
                    shape = base::wire_shape(*t);
                    if Self::skip_shape(s, shape) {
                        return Ok(());
                    }
                }
                PathElem::Mask(m) => mask = *m,
                PathElem::Point { x, y, ext } => {
                    let Some(layer) = layer else {
                        return Self::no_layer(s);
                    };
                    let cur = s.units.point(Point::new(*x, *y));
                    let ext = ext.map(|e| s.units.dbdist(e));
                    if let Some((p, p_ext)) = prev {
                        if let Some(sbox) = create_box(layer, p, p_ext, cur, ext, width) {
                            self.sbox(s, block, swire, sbox, shape, mask);
                        }
                    }
                    prev = Some((cur, ext));
                    mask = 0;
                }
                PathElem::Via { name, orient } => {
                    Self::check_orient(s, name, *orient)?;
                    let Some((origin, _)) = prev else {
                        return Self::no_layer(s);
                    };
                    if let Some(via) = s.find_via(block, name) {
                        self.sbox(s, block, swire, SBoxShape::Via { via, origin }, shape, mask);
                        layer = exit_layer(s, block, via, layer);
                    }
                    mask = 0;
                }
                PathElem::ViaArray {
                    name,
                    orient,
                    num_x,
                    num_y,
                    step_x,
                    step_y,
                } => {
                    Self::check_orient(s, name, *orient)?;
                    let Some((origin, _)) = prev else {
                        return Self::no_layer(s);
                    };
                    let Some(via) = s.find_via(block, name) else {
                        continue;
                    };
                    let (dx, dy) = (s.units.dbdist(*step_x), s.units.dbdist(*step_y));
                    for i in 0..*num_x as i64 {
                        for j in 0..*num_y as i64 {
                            let at = origin + Point::new(i * dx, j * dy);
                            let sbox = SBoxShape::Via { via, origin: at };
                            self.sbox(s, block, swire, sbox, shape, mask);
                        }
                    }
                    mask = 0;
                }
                PathElem::Rect { dx1, dy1, dx2, dy2 } => {
                    let (Some(layer), Some((origin, _))) = (layer, prev) else {
                        return Self::no_layer(s);
                    };
                    let u = &s.units;
                    let rect = Rect::from_corners(
                        Point::new(u.dbdist(*dx1), u.dbdist(*dy1)),
                        Point::new(u.dbdist(*dx2), u.dbdist(*dy2)),
                    )
                    .translate(origin);
                    self.sbox(s, block, swire, SBoxShape::Rect { layer, rect }, shape, mask);
                    mask = 0;
                }
                PathElem::Style(_) => s.unsupported(164, "STYLE in special wiring")?,
                PathElem::Virtual { .. } => {
                    s.unsupported(163, "VIRTUAL point in special wiring")?
                }
                PathElem::Taper | PathElem::TaperRule(_) => {
                    s.report(165, IssueKind::Invalid, "taper in special wiring");
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Special wiring given as fixed shapes.
    fn shape(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        net: Id<Net>,
        wiring: &GeometrySpecialWiring,
    ) -> CallbackResult {
        let shape = wiring.shape.map(base::wire_shape).unwrap_or_default();
        if Self::skip_shape(s, shape) {
            return Ok(());
        }
        let status = wiring.status.clone().unwrap_or(RoutingStatus::Routed);
        let Some(swire) = self.swire(s, block, net, &status) else {
            return Ok(());
        };
        let mask = wiring.mask.unwrap_or(0);
        match &wiring.item {
            SpecialShape::Rect { layer, rect } => {
                let Some(layer) = s.find_layer(layer) else {
                    return Ok(());
                };
                let rect = s.units.rect(*rect);
                self.sbox(s, block, swire, SBoxShape::Rect { layer, rect }, shape, mask);
            }
            SpecialShape::Polygon { layer, polygon } => {
                let Some(layer) = s.find_layer(layer) else {
                    return Ok(());
                };
                let rects = s.geometry_rects(&def::Geometry::Polygon(polygon.clone()))?;
                for rect in rects {
                    self.sbox(s, block, swire, SBoxShape::Rect { layer, rect }, shape, mask);
                }
            }
            SpecialShape::Via { name, orient, pts } => {
                Self::check_orient(s, name, *orient)?;
                let Some(via) = s.find_via(block, name) else {
                    return Ok(());
                };
                for &pt in pts {
                    let origin = s.units.point(pt);
                    self.sbox(s, block, swire, SBoxShape::Via { via, origin }, shape, mask);
                }
            }
        }
        Ok(())
    }

    fn sbox(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        swire: Id<SWire>,
        sbox: SBoxShape,
        shape: WireShapeType,
        mask: u32,
    ) {
        s.db.block_mut(block).create_sbox(swire, sbox, shape, mask);
        self.sboxes += 1;
    }

    fn check_orient(
        s: &mut Session<'_>,
        via: &str,
        orient: Option<NamedOrientation>,
    ) -> CallbackResult {
        match orient {
            Some(o) if o != NamedOrientation::N => {
                s.unsupported(171, format!("rotated via {via} in special wiring"))
            }
            _ => Ok(()),
        }
    }

    fn no_layer(s: &mut Session<'_>) -> CallbackResult {
        s.report(162, IssueKind::Invalid, "special wiring path has no layer");
        Ok(())
    }

    pub fn end(&self) {
        if self.created > 0 {
            tracing::info!("    Created {} special nets", self.created);
        }
        if self.nets > 0 {
            tracing::info!(
                "    Read {} special nets, {} connections and {} shapes",
                self.nets,
                self.connections,
                self.sboxes
            );
        }
    }
}

/// The layer a special path continues on after `via`.
fn exit_layer(
    s: &Session<'_>,
    block: Id<Block>,
    via: ViaRef,
    cur: Option<Id<TechLayer>>,
) -> Option<Id<TechLayer>> {
    let (bot, top) = via.layer_range(s.db.tech(s.tech), s.db.block(block))?;
    match cur {
        Some(cur) if cur == top => Some(bot),
        _ => Some(top),
    }
}

//! NETS: connections, attributes and regular wiring.

use geometry::prelude::*;
use lefdef::def::{self, CallbackResult, NetPin, Path, PathElem};
use odb::block::{Net, NetFlags, PropTarget, WireEncoder, WireType};
use odb::{Block, Id};

use crate::base::{self, Session};
use crate::issue::IssueKind;

/// How a path picks its layer rule.
#[derive(Debug, Clone, Copy)]
enum Taper<'r> {
    /// The rule of the net's non-default rule, if any.
    Default,
    /// `TAPER`: the default rule of the technology.
    None,
    /// `TAPERRULE`: the named non-default rule.
    Rule(&'r str),
}

/// Builds one net at a time.
///
/// A net is opened by [`NetBuilder::begin`], receives connections, attributes
/// and paths, and is closed by [`NetBuilder::end_net`], which commits the wire
/// encoded from its paths. A path that cannot be resolved fails the whole
/// wire.
#[derive(Debug, Default)]
pub(crate) struct NetBuilder {
    net: Option<Id<Net>>,
    encoder: WireEncoder,
    /// Whether wiring was read for the open net.
    wiring: bool,
    failed: bool,
    created: usize,
    nets: usize,
    connections: usize,
}

impl NetBuilder {
    pub fn build(&mut self, s: &mut Session<'_>, block: Id<Block>, net: def::Net) -> CallbackResult {
        if !self.begin(s, block, &net.name) {
            return Ok(());
        }
        let result = self.fill(s, block, &net);
        self.end_net(s, block);
        result
    }

    fn fill(&mut self, s: &mut Session<'_>, block: Id<Block>, net: &def::Net) -> CallbackResult {
        if s.policy.connections {
            for conn in &net.connections {
                self.connection(s, block, conn);
            }
        }
        if s.policy.create {
            self.attributes(s, block, net)?;
        }
        if s.policy.wiring && !s.opts.skip_wires {
            self.wiring = true;
            for wiring in &net.wiring {
                let wire_type = base::wire_type(&wiring.status);
                if let Some(id) = self.net {
                    s.db.block_mut(block).net_mut(id).wire_type = wire_type;
                }
                for path in &wiring.paths {
                    self.path(s, block, wire_type, path)?;
                }
            }
        }
        Ok(())
    }

    /// Opens the net named `name`. Returns `false` if the net is skipped.
    fn begin(&mut self, s: &mut Session<'_>, block: Id<Block>, name: &str) -> bool {
        debug_assert!(self.net.is_none(), "net {name} opened inside another net");
        let net = match s.find_net(block, name) {
            Some(net) => net,
            None if s.policy.create => match s.db.block_mut(block).create_net(name) {
                Some(net) => {
                    self.created += 1;
                    net
                }
                None => return false,
            },
            None => {
                s.report(
                    160,
                    IssueKind::ModeMismatch,
                    format!("net {name} does not exist"),
                );
                return false;
            }
        };
        s.touch_net(block, net);
        self.net = Some(net);
        self.wiring = false;
        self.failed = false;
        self.encoder.clear();
        self.nets += 1;
        true
    }

    fn connection(&mut self, s: &mut Session<'_>, block: Id<Block>, conn: &NetPin) {
        let Some(net) = self.net else {
            return;
        };
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

    fn attributes(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        net: &def::Net,
    ) -> CallbackResult {
        let Some(id) = self.net else {
            return Ok(());
        };
        if net.has_subnets {
            s.unsupported(168, format!("SUBNET of net {}", net.name))?;
        }
        if !net.shield_nets.is_empty() {
            s.unsupported(169, format!("SHIELDNET of net {}", net.name))?;
        }
        let ndr = match &net.nondefault_rule {
            Some(name) => s.find_ndr(block, name),
            None => None,
        };

        let n = s.db.block_mut(block).net_mut(id);
        if let Some(net_use) = net.net_use {
            n.sig_type = base::sig_type(net_use);
        }
        if let Some(source) = net.source {
            n.source = base::source(source);
        }
        if let Some(xtalk) = net.xtalk {
            n.xtalk = xtalk as i32;
        }
        if let Some(weight) = net.weight {
            n.weight = weight as i32;
        }
        if ndr.is_some() {
            n.ndr = ndr;
        }
        n.flags.set(NetFlags::FIXED_BUMP, net.fixed_bump);
        n.flags.set(NetFlags::HAS_VIRTUAL_PINS, net.has_virtual_pins);
        s.add_properties(block, PropTarget::Net, id.into(), &net.properties);
        Ok(())
    }

    fn path(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        wire_type: WireType,
        path: &Path,
    ) -> CallbackResult {
        if self.failed {
            return Ok(());
        }
        let mut elems = path.elems.iter().peekable();
        let Some(PathElem::Layer(layer)) = elems.next() else {
            s.report(165, IssueKind::Invalid, "path does not start with a layer");
            self.fail();
            return Ok(());
        };
        let mut taper = Taper::Default;
        while let Some(&elem) = elems.peek() {
            match elem {
                PathElem::Taper => taper = Taper::None,
                PathElem::TaperRule(name) => taper = Taper::Rule(name),
                _ => break,
            }
            elems.next();
        }
        if !self.path_begin(s, block, layer, wire_type, taper) {
            return Ok(());
        }

        for elem in elems {
            match elem {
                PathElem::Mask(mask) => self.encoder.set_color(*mask),
                PathElem::Point { x, y, ext } => {
                    let pt = s.units.point(Point::new(*x, *y));
                    let ext = ext.map(|e| s.units.dbdist(e));
                    self.encoder.add_point(pt, ext);
                }
                PathElem::Via { name, orient } => {
                    if orient.is_some_and(|o| o != NamedOrientation::N) {
                        s.unsupported(170, format!("rotated via {name} in regular wiring"))?;
                    }
                    self.path_via(s, block, name);
                }
                PathElem::Rect { dx1, dy1, dx2, dy2 } => {
                    let u = &s.units;
                    let rect = Rect::from_corners(
                        Point::new(u.dbdist(*dx1), u.dbdist(*dy1)),
                        Point::new(u.dbdist(*dx2), u.dbdist(*dy2)),
                    );
                    self.encoder.add_rect(rect);
                }
                PathElem::Style(_) => {
                    s.unsupported(164, "STYLE in regular wiring")?;
                }
                PathElem::Virtual { .. } => {
                    s.unsupported(163, "VIRTUAL point in regular wiring")?;
                }
                other => {
                    s.report(
                        165,
                        IssueKind::Invalid,
                        format!("unexpected {other:?} in regular wiring"),
                    );
                    self.fail();
                }
            }
            if self.failed {
                break;
            }
        }
        Ok(())
    }

    /// Starts a path on `layer`. Fails the wire if the layer or its rule
    /// cannot be resolved.
    fn path_begin(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        layer: &str,
        wire_type: WireType,
        taper: Taper<'_>,
    ) -> bool {
        let Some(net) = self.net else {
            return false;
        };
        let Some(layer_id) = s.find_layer(layer) else {
            self.fail();
            return false;
        };
        let ndr = match taper {
            Taper::None => None,
            Taper::Rule(name) => match s.find_ndr(block, name) {
                Some(ndr) => Some(ndr),
                None => {
                    self.fail();
                    return false;
                }
            },
            Taper::Default => s.db.block(block).net(net).ndr,
        };
        let rule = match ndr {
            Some(ndr) => match s.ndr_layer_rule(block, ndr, layer_id) {
                Some(rule) => Some(rule),
                None => {
                    s.report(
                        166,
                        IssueKind::Referential,
                        format!("non-default rule has no rule for layer {layer}"),
                    );
                    self.fail();
                    return false;
                }
            },
            None => None,
        };
        self.encoder.new_path(layer_id, wire_type, rule);
        true
    }

    /// Adds a via; the path continues on whichever of its layers it did not
    /// enter on.
    fn path_via(&mut self, s: &mut Session<'_>, block: Id<Block>, name: &str) {
        let Some(via) = s.find_via(block, name) else {
            self.fail();
            return;
        };
        let range = via.layer_range(s.db.tech(s.tech), s.db.block(block));
        let exit = match (range, self.encoder.layer()) {
            (Some((bot, top)), Some(cur)) if bot != top => {
                if cur == bot {
                    Some(top)
                } else if cur == top {
                    Some(bot)
                } else {
                    None
                }
            }
            _ => None,
        };
        match exit {
            Some(exit) => self.encoder.add_via(via, exit),
            None => {
                s.report(
                    167,
                    IssueKind::Invalid,
                    format!("cannot determine the exit layer of via {name}"),
                );
                self.fail();
            }
        }
    }

    fn fail(&mut self) {
        self.failed = true;
        self.encoder.clear();
    }

    /// Closes the open net, committing its wire.
    fn end_net(&mut self, s: &mut Session<'_>, block: Id<Block>) {
        let Some(net) = self.net.take() else {
            return;
        };
        if !self.wiring {
            return;
        }
        let b = s.db.block_mut(block);
        if self.failed {
            b.destroy_wire(net);
        } else {
            self.encoder.commit(b, net);
        }
        self.encoder.clear();
    }

    pub fn end(&self) {
        if self.created > 0 {
            tracing::info!("    Created {} nets", self.created);
        }
        if self.nets > 0 {
            tracing::info!(
                "    Read {} nets and {} connections",
                self.nets,
                self.connections
            );
        }
    }
}

//! State shared by every construct builder.

use std::collections::HashSet;

use geometry::prelude::*;
use lazy_static::lazy_static;
use lefdef::def::{
    self, Abort, CallbackResult, Geometry, NetUse, Property, RoutingStatus, ShapeType,
};
use odb::block::{
    BTerm, ITerm, Inst, MasterRef, Net, PlacementStatus, PropKind, PropTarget, RuleRef, SWire,
    SiteRef, Source, ViaRef, WireShapeType, WireType,
};
use odb::library::{IoType, SigType};
use odb::object::{ObjectRef, ObjectType};
use odb::rule::{LayerRule, NonDefaultRule};
use odb::tech::{Tech, TechLayer};
use odb::{Block, Database, Id, Lib, PropValue, PropertyScope};
use regex::Regex;

use crate::issue::{Issue, IssueKind, IssueLog};
use crate::options::ReaderOptions;
use crate::Mode;

lazy_static! {
    /// A component name that encodes an instance id.
    static ref INST_ID_REGEX: Regex = Regex::new(r"^I(\d+)$").unwrap();
    /// A net name that encodes a net id.
    static ref NET_ID_REGEX: Regex = Regex::new(r"^N(\d+)$").unwrap();
}

/// Converts DEF distances to database units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Units {
    def_units: u32,
    factor: f64,
}

impl Units {
    /// Conversion from `def_units` per micron to `dbu_per_micron`.
    pub fn new(dbu_per_micron: u32, def_units: u32) -> Self {
        Self {
            def_units,
            factor: dbu_per_micron as f64 / def_units as f64,
        }
    }

    pub fn def_units(&self) -> u32 {
        self.def_units
    }

    /// Database units per DEF unit.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Converts a DEF distance, truncating toward zero.
    ///
    /// ```
    /// # use defin::Units;
    /// let units = Units::new(1000, 100);
    /// assert_eq!(units.dbdist(250), 2500);
    /// ```
    #[inline]
    pub fn dbdist(&self, value: i64) -> i64 {
        (value as f64 * self.factor) as i64
    }

    /// Converts a fractional DEF distance, rounding half away from zero.
    #[inline]
    pub fn dbdist_f64(&self, value: f64) -> i64 {
        (value * self.factor).round() as i64
    }

    pub fn point(&self, p: Point) -> Point {
        Point::new(self.dbdist(p.x), self.dbdist(p.y))
    }

    pub fn rect(&self, r: Rect) -> Rect {
        Rect::from_sides(
            self.dbdist(r.left()),
            self.dbdist(r.bot()),
            self.dbdist(r.right()),
            self.dbdist(r.top()),
        )
    }

    pub fn polygon(&self, p: &Polygon) -> Polygon {
        Polygon::from_verts(p.points().iter().map(|&pt| self.point(pt)).collect())
    }
}

/// What an import may do to the target block.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Policy {
    /// Objects missing from the block are created. Otherwise they are
    /// reported and skipped.
    pub create: bool,
    /// Objects already in the block are updated. Otherwise they are reported
    /// as duplicates.
    pub merge: bool,
    pub connections: bool,
    pub wiring: bool,
}

impl Policy {
    pub fn new(mode: Mode, wires_only: bool, opts: &ReaderOptions) -> Self {
        if wires_only {
            return Self {
                create: false,
                merge: true,
                connections: false,
                wiring: true,
            };
        }
        Self {
            create: mode == Mode::Default,
            merge: mode != Mode::Default || opts.assembly_mode,
            connections: !opts.skip_connections,
            wiring: mode != Mode::Floorplan,
        }
    }
}

/// Objects whose lists were extended during an import.
///
/// Lists are built by prepending. An object's lists are flipped to build
/// order on first touch and back to creation order once when the import
/// ends, so objects that existed before the import keep their order.
#[derive(Debug, Default)]
struct Touched {
    nets: HashSet<Id<Net>>,
    bterms: HashSet<Id<BTerm>>,
    swires: HashSet<Id<SWire>>,
    props: HashSet<ObjectRef>,
}

/// The database, the options and the issues of one import.
pub(crate) struct Session<'a> {
    pub db: &'a mut Database,
    pub tech: Id<Tech>,
    /// Libraries searched for masters and sites; empty means all.
    pub libs: Vec<Id<Lib>>,
    pub mode: Mode,
    pub policy: Policy,
    pub opts: &'a ReaderOptions,
    pub log: IssueLog,
    pub units: Units,
    pub block: Option<Id<Block>>,
    touched: Touched,
}

impl<'a> Session<'a> {
    pub fn new(
        db: &'a mut Database,
        tech: Id<Tech>,
        libs: Vec<Id<Lib>>,
        mode: Mode,
        policy: Policy,
        opts: &'a ReaderOptions,
    ) -> Self {
        let dbu = db.tech(tech).dbu_per_micron;
        Self {
            db,
            tech,
            libs,
            mode,
            policy,
            opts,
            log: IssueLog::new(),
            units: Units::new(dbu, dbu),
            block: None,
            touched: Touched::default(),
        }
    }

    pub fn report(&mut self, id: u32, kind: IssueKind, message: impl Into<String>) {
        self.log.add(Issue::new_and_log(id, kind, message));
    }

    /// Reports a feature the database cannot hold. Stops the parse unless
    /// errors are tolerated.
    pub fn unsupported(&mut self, id: u32, message: impl Into<String>) -> CallbackResult {
        self.report(id, IssueKind::Unsupported, message);
        if self.opts.continue_on_errors {
            Ok(())
        } else {
            Err(Abort)
        }
    }

    /// The block being built. A construct before DESIGN stops the parse.
    pub fn check_block(&mut self) -> Result<Id<Block>, Abort> {
        match self.block {
            Some(block) => Ok(block),
            None => {
                self.report(
                    100,
                    IssueKind::Structural,
                    "DESIGN statement is missing before this construct",
                );
                Err(Abort)
            }
        }
    }

    pub fn tech(&self) -> &Tech {
        self.db.tech(self.tech)
    }

    pub fn find_layer(&mut self, name: &str) -> Option<Id<TechLayer>> {
        let layer = self.tech().find_layer(name);
        if layer.is_none() {
            self.report(110, IssueKind::Referential, format!("undefined layer {name}"));
        }
        layer
    }

    /// Finds a via defined by the block or, failing that, the technology.
    pub fn find_via(&mut self, block: Id<Block>, name: &str) -> Option<ViaRef> {
        let via = self
            .db
            .block(block)
            .find_via(name)
            .map(ViaRef::Block)
            .or_else(|| self.tech().find_via(name).map(ViaRef::Tech));
        if via.is_none() {
            self.report(111, IssueKind::Referential, format!("undefined via {name}"));
        }
        via
    }

    fn search_libs(&self) -> Vec<Id<Lib>> {
        if self.libs.is_empty() {
            self.db.libs().map(|(id, _)| id).collect()
        } else {
            self.libs.clone()
        }
    }

    pub fn find_master(&mut self, name: &str) -> Option<MasterRef> {
        let master = self.search_libs().into_iter().find_map(|lib| {
            Some(MasterRef {
                lib,
                master: self.db.lib(lib).find_master(name)?,
            })
        });
        if master.is_none() {
            self.report(112, IssueKind::Referential, format!("undefined master {name}"));
        }
        master
    }

    pub fn find_site(&mut self, name: &str) -> Option<SiteRef> {
        let site = self.search_libs().into_iter().find_map(|lib| {
            Some(SiteRef {
                lib,
                site: self.db.lib(lib).find_site(name)?,
            })
        });
        if site.is_none() {
            self.report(113, IssueKind::Referential, format!("undefined site {name}"));
        }
        site
    }

    /// Finds a non-default rule of the block or, failing that, the technology.
    pub fn find_ndr(&mut self, block: Id<Block>, name: &str) -> Option<RuleRef<NonDefaultRule>> {
        let rule = self
            .db
            .block(block)
            .rules
            .find_ndr(name)
            .map(RuleRef::Block)
            .or_else(|| self.tech().rules.find_ndr(name).map(RuleRef::Tech));
        if rule.is_none() {
            self.report(
                114,
                IssueKind::Referential,
                format!("undefined non-default rule {name}"),
            );
        }
        rule
    }

    /// The rule `ndr` gives for `layer`, if any.
    pub fn ndr_layer_rule(
        &self,
        block: Id<Block>,
        ndr: RuleRef<NonDefaultRule>,
        layer: Id<TechLayer>,
    ) -> Option<RuleRef<LayerRule>> {
        match ndr {
            RuleRef::Tech(id) => self.tech().rules.find_layer_rule(id, layer).map(RuleRef::Tech),
            RuleRef::Block(id) => self
                .db
                .block(block)
                .rules
                .find_layer_rule(id, layer)
                .map(RuleRef::Block),
        }
    }

    /// Like [`Session::find_inst`], reporting a component that does not exist.
    pub fn find_component(&mut self, block: Id<Block>, name: &str) -> Option<Id<Inst>> {
        let inst = self.find_inst(block, name);
        if inst.is_none() {
            self.report(116, IssueKind::Referential, format!("undefined component {name}"));
        }
        inst
    }

    /// Finds a component by name, or by id when names are database ids.
    pub fn find_inst(&self, block: Id<Block>, name: &str) -> Option<Id<Inst>> {
        let block = self.db.block(block);
        if self.opts.names_are_db_ids {
            if let Some(id) = id_from_name::<Inst>(&INST_ID_REGEX, name) {
                return is_live(block, ObjectType::Inst, id.oid()).then_some(id);
            }
        }
        block.find_inst(name)
    }

    /// Finds a net by name, or by id when names are database ids.
    pub fn find_net(&self, block: Id<Block>, name: &str) -> Option<Id<Net>> {
        let block = self.db.block(block);
        if self.opts.names_are_db_ids {
            if let Some(id) = id_from_name::<Net>(&NET_ID_REGEX, name) {
                return is_live(block, ObjectType::Net, id.oid()).then_some(id);
            }
        }
        block.find_net(name)
    }

    /// The terminal of `inst` for the master pin named `pin`.
    pub fn find_iterm(&mut self, block: Id<Block>, inst: Id<Inst>, pin: &str) -> Option<Id<ITerm>> {
        let b = self.db.block(block);
        let master = b.inst(inst).master;
        let iterm = self
            .db
            .lib(master.lib)
            .find_mterm(master.master, pin)
            .and_then(|mterm| b.find_iterm(inst, mterm));
        if iterm.is_none() {
            let name = b.inst(inst).name.clone();
            self.report(
                117,
                IssueKind::Referential,
                format!("component {name} has no pin {pin}"),
            );
        }
        iterm
    }

    /// Converts a DEF shape to rectangles in database units.
    pub fn geometry_rects(&mut self, geometry: &Geometry) -> Result<Vec<Rect>, Abort> {
        match geometry {
            Geometry::Rect(rect) => Ok(vec![self.units.rect(*rect)]),
            Geometry::Polygon(poly) => match self.units.polygon(poly).decompose_rects() {
                Some(rects) => Ok(rects),
                None => {
                    self.unsupported(133, "non-rectilinear polygon")?;
                    Ok(Vec::new())
                }
            },
        }
    }

    pub fn touch_net(&mut self, block: Id<Block>, net: Id<Net>) {
        if self.touched.nets.insert(net) {
            self.db.block_mut(block).normalize_net(net);
        }
    }

    pub fn touch_bterm(&mut self, block: Id<Block>, bterm: Id<BTerm>) {
        if self.touched.bterms.insert(bterm) {
            self.db.block_mut(block).normalize_bterm(bterm);
        }
    }

    pub fn touch_swire(&mut self, swire: Id<SWire>) {
        self.touched.swires.insert(swire);
    }

    /// Attaches DEF properties to a block object, typed by their definitions.
    pub fn add_properties(
        &mut self,
        block: Id<Block>,
        target: PropTarget,
        obj: ObjectRef,
        props: &[Property],
    ) {
        if props.is_empty() {
            return;
        }
        // Net and terminal properties are normalized with their owner.
        let owned = matches!(obj.kind, ObjectType::Net | ObjectType::BTerm);
        if !owned && self.touched.props.insert(obj) {
            self.db.block_mut(block).normalize_properties(obj);
        }
        for prop in props {
            let Some(value) = self.property_value(block, target, &prop.name, &prop.val) else {
                continue;
            };
            if self
                .db
                .block_mut(block)
                .create_property(obj, &prop.name, value)
                .is_none()
            {
                self.report(
                    121,
                    IssueKind::Invalid,
                    format!("duplicate property {} on {:?}", prop.name, obj.kind),
                );
            }
        }
    }

    /// Types a property value according to its definition.
    pub fn property_value(
        &mut self,
        block: Id<Block>,
        target: PropTarget,
        name: &str,
        val: &str,
    ) -> Option<PropValue> {
        let b = self.db.block(block);
        let Some(def) = b.find_property_definition(target, name) else {
            self.report(
                120,
                IssueKind::Referential,
                format!("property {name} is not defined for {target:?}"),
            );
            return None;
        };
        let kind = b.property_definition(def).kind;
        let value = parse_property(kind, val);
        if value.is_none() {
            self.report(
                122,
                IssueKind::Invalid,
                format!("invalid {kind:?} value {val:?} for property {name}"),
            );
        }
        value
    }

    /// Restores creation order of every list touched by the import.
    pub fn finish(&mut self) {
        let touched = std::mem::take(&mut self.touched);
        let Some(block) = self.block else {
            return;
        };
        if !self.db.is_valid_block(block) {
            return;
        }
        let b = self.db.block_mut(block);
        for net in touched.nets {
            b.normalize_net(net);
        }
        for bterm in touched.bterms {
            b.normalize_bterm(bterm);
        }
        for swire in touched.swires {
            b.normalize_swire(swire);
        }
        for obj in touched.props {
            b.normalize_properties(obj);
        }
    }
}

/// Whether a connection names an I/O pin rather than a component.
pub(crate) fn is_io_pin(component: &str) -> bool {
    component.eq_ignore_ascii_case("PIN")
}

pub(crate) fn sig_type(net_use: NetUse) -> SigType {
    match net_use {
        NetUse::Analog => SigType::Analog,
        NetUse::Clock => SigType::Clock,
        NetUse::Ground => SigType::Ground,
        NetUse::Power => SigType::Power,
        NetUse::Reset => SigType::Reset,
        NetUse::Scan => SigType::Scan,
        NetUse::Signal => SigType::Signal,
        NetUse::Tieoff => SigType::Tieoff,
    }
}

pub(crate) fn wire_shape(shape: ShapeType) -> WireShapeType {
    match shape {
        ShapeType::Ring => WireShapeType::Ring,
        ShapeType::PadRing => WireShapeType::PadRing,
        ShapeType::BlockRing => WireShapeType::BlockRing,
        ShapeType::Stripe => WireShapeType::Stripe,
        ShapeType::FollowPin => WireShapeType::FollowPin,
        ShapeType::IoWire => WireShapeType::IoWire,
        ShapeType::CoreWire => WireShapeType::CoreWire,
        ShapeType::BlockWire => WireShapeType::BlockWire,
        ShapeType::BlockageWire => WireShapeType::BlockageWire,
        ShapeType::FillWire => WireShapeType::FillWire,
        ShapeType::FillWireOpc => WireShapeType::FillWireOpc,
        ShapeType::DrcFill => WireShapeType::DrcFill,
    }
}

pub(crate) fn io_type(direction: def::PinDirection) -> IoType {
    match direction {
        def::PinDirection::Input => IoType::Input,
        def::PinDirection::Output => IoType::Output,
        def::PinDirection::InOut => IoType::InOut,
        def::PinDirection::Feedthru => IoType::Feedthru,
    }
}

pub(crate) fn source(source: def::Source) -> Source {
    match source {
        def::Source::Netlist => Source::Netlist,
        def::Source::Dist => Source::Dist,
        def::Source::User => Source::User,
        def::Source::Timing => Source::Timing,
        def::Source::Test => Source::Test,
    }
}

pub(crate) fn wire_type(status: &RoutingStatus) -> WireType {
    match status {
        RoutingStatus::Cover => WireType::Cover,
        RoutingStatus::Fixed => WireType::Fixed,
        RoutingStatus::Routed => WireType::Routed,
        RoutingStatus::NoShield => WireType::NoShield,
        RoutingStatus::Shield(_) => WireType::Shield,
    }
}

/// The database placement status of a DEF placement.
///
/// DEF `FIXED` objects may still be moved by a user, which the database
/// calls firm.
pub(crate) fn placement_status(status: &def::PlacementStatus) -> PlacementStatus {
    match status {
        def::PlacementStatus::Placed { .. } => PlacementStatus::Placed,
        def::PlacementStatus::Fixed { .. } => PlacementStatus::Firm,
        def::PlacementStatus::Cover { .. } => PlacementStatus::Cover,
        def::PlacementStatus::Unplaced => PlacementStatus::Unplaced,
    }
}

/// Parses a property value of the given type.
pub(crate) fn parse_property(kind: PropKind, val: &str) -> Option<PropValue> {
    match kind {
        PropKind::Integer => val.parse().ok().map(PropValue::Int),
        PropKind::Real => val.parse().ok().map(PropValue::Double),
        PropKind::String => Some(PropValue::String(val.to_string())),
    }
}

fn id_from_name<T>(regex: &Regex, name: &str) -> Option<Id<T>> {
    let caps = regex.captures(name)?;
    Id::from_raw(caps[1].parse().ok()?)
}

fn is_live(block: &Block, kind: ObjectType, oid: u32) -> bool {
    block
        .object_table(kind)
        .is_some_and(|table| table.is_valid(oid))
}

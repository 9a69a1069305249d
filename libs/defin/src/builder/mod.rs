//! Routes parser callbacks to the builder of each DEF construct.

use lefdef::def::{
    Abort, Blockage, CallbackResult, Component, DefCallbacks, DieArea, Fill, GcellGrid, Group,
    Net, NonDefaultRule, Pin, PinProperties, PropertyDefinition, Region, Row, SpecialNet, Tracks,
    Via,
};
use odb::tech::Tech;
use odb::{Block, Chip, Database, Id, Lib};

use crate::base::{Policy, Session, Units};
use crate::issue::{IssueKind, IssueLog};
use crate::options::ReaderOptions;
use crate::Mode;

mod blockage;
mod component;
mod floorplan;
mod ndr;
mod net;
mod pin;
mod prop;
mod region;
mod snet;
mod via;

use blockage::BlockageBuilder;
use component::ComponentBuilder;
use floorplan::FloorplanBuilder;
use ndr::NdrBuilder;
use net::NetBuilder;
use pin::PinBuilder;
use prop::PropBuilder;
use region::RegionBuilder;
use snet::SNetBuilder;
use via::ViaBuilder;

/// Where an import puts the design.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Target {
    /// The top block of a chip named after the design.
    Chip,
    /// A child of the given block.
    Child(Id<Block>),
    /// The wiring of an existing block.
    Wires(Id<Block>),
}

/// What an import produced.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub log: IssueLog,
    pub block: Option<Id<Block>>,
    /// The chip created by this import, if any.
    pub created_chip: Option<Id<Chip>>,
    /// The block created by this import, if any.
    pub created_block: Option<Id<Block>>,
}

/// Header values that can precede DESIGN.
#[derive(Debug, Default)]
struct Header {
    divider: Option<char>,
    bus_bits: Option<(char, char)>,
    def_units: Option<u32>,
}

pub(crate) struct DefBuilder<'a> {
    s: Session<'a>,
    target: Target,
    header: Header,
    created_chip: Option<Id<Chip>>,
    created_block: Option<Id<Block>>,
    components: ComponentBuilder,
    pins: PinBuilder,
    nets: NetBuilder,
    snets: SNetBuilder,
    vias: ViaBuilder,
    ndrs: NdrBuilder,
    floorplan: FloorplanBuilder,
    regions: RegionBuilder,
    blockages: BlockageBuilder,
    props: PropBuilder,
}

impl<'a> DefBuilder<'a> {
    pub fn new(
        db: &'a mut Database,
        tech: Id<Tech>,
        libs: Vec<Id<Lib>>,
        mode: Mode,
        opts: &'a ReaderOptions,
        target: Target,
    ) -> Self {
        let policy = Policy::new(mode, matches!(target, Target::Wires(_)), opts);
        tracing::debug!(?target, ?policy, "starting DEF import");
        Self {
            s: Session::new(db, tech, libs, mode, policy, opts),
            target,
            header: Header::default(),
            created_chip: None,
            created_block: None,
            components: ComponentBuilder::default(),
            pins: PinBuilder::default(),
            nets: NetBuilder::default(),
            snets: SNetBuilder::default(),
            vias: ViaBuilder::default(),
            ndrs: NdrBuilder::default(),
            floorplan: FloorplanBuilder::default(),
            regions: RegionBuilder::default(),
            blockages: BlockageBuilder::default(),
            props: PropBuilder::default(),
        }
    }

    /// Ends every builder and hands back what the import produced.
    pub fn finish(mut self) -> Outcome {
        if let Some(block) = self.s.block {
            if self.s.db.is_valid_block(block) {
                self.props.end(&mut self.s, block);
            }
        }
        self.components.end();
        self.pins.end();
        self.nets.end();
        self.snets.end();
        self.vias.end();
        self.ndrs.end();
        self.floorplan.end();
        self.regions.end();
        self.blockages.end();
        self.s.finish();
        Outcome {
            log: self.s.log,
            block: self.s.block,
            created_chip: self.created_chip,
            created_block: self.created_block,
        }
    }

    /// The name of the block to read into.
    fn block_name(&self, design: &str) -> String {
        self.s
            .opts
            .block_name
            .clone()
            .unwrap_or_else(|| design.to_string())
    }

    fn design_chip(&mut self, name: &str) -> Result<Id<Block>, Abort> {
        let existing = self.s.db.find_chip(name);
        if !self.s.policy.create {
            let top = existing.and_then(|chip| self.s.db.chip(chip).top());
            return top.ok_or_else(|| {
                self.s.report(
                    102,
                    IssueKind::Structural,
                    format!("chip {name} does not exist"),
                );
                Abort
            });
        }
        if let Some(chip) = existing {
            if let Some(top) = self.s.db.chip(chip).top().filter(|_| self.s.opts.assembly_mode) {
                return Ok(top);
            }
            self.s.report(
                101,
                IssueKind::Structural,
                format!("chip {name} already exists"),
            );
            return Err(Abort);
        }
        let block_name = self.block_name(name);
        let chip = self.s.db.create_chip(name).ok_or_else(|| {
            self.s.report(101, IssueKind::Structural, format!("chip {name} already exists"));
            Abort
        })?;
        self.created_chip = Some(chip);
        let tech = self.s.tech;
        let block = self
            .s
            .db
            .create_block(chip, None, &block_name, tech)
            .ok_or(Abort)?;
        self.created_block = Some(block);
        Ok(block)
    }

    fn design_child(&mut self, parent: Id<Block>, name: &str) -> Result<Id<Block>, Abort> {
        let block_name = self.block_name(name);
        let existing = self.s.db.find_child(parent, &block_name);
        match existing {
            Some(block) if self.s.policy.merge => Ok(block),
            Some(_) => {
                self.s.report(
                    103,
                    IssueKind::Structural,
                    format!("block {block_name} already exists"),
                );
                Err(Abort)
            }
            None if self.s.policy.create => {
                let chip = self.s.db.block(parent).chip;
                let tech = self.s.tech;
                let block = self
                    .s
                    .db
                    .create_block(chip, Some(parent), &block_name, tech)
                    .ok_or(Abort)?;
                self.created_block = Some(block);
                Ok(block)
            }
            None => {
                self.s.report(
                    104,
                    IssueKind::Structural,
                    format!("block {block_name} does not exist"),
                );
                Err(Abort)
            }
        }
    }

    /// Stores header values on a block being built.
    fn apply_header(&mut self) {
        let Some(block) = self.s.block else {
            return;
        };
        if !self.s.policy.create {
            return;
        }
        let b = self.s.db.block_mut(block);
        if let Some(divider) = self.header.divider {
            b.divider = divider as u8;
        }
        if let Some((open, close)) = self.header.bus_bits {
            b.bus_delimiters = (open as u8, close as u8);
        }
        if let Some(units) = self.header.def_units {
            b.def_units = units;
        }
    }
}

impl DefCallbacks for DefBuilder<'_> {
    fn version(&mut self, version: f64) -> CallbackResult {
        tracing::debug!(version, "DEF version");
        Ok(())
    }

    fn divider_char(&mut self, divider: char) -> CallbackResult {
        if !divider.is_ascii() {
            return self.s.unsupported(135, format!("divider character {divider:?}"));
        }
        self.header.divider = Some(divider);
        self.apply_header();
        Ok(())
    }

    fn bus_bit_chars(&mut self, open: char, close: char) -> CallbackResult {
        if !open.is_ascii() || !close.is_ascii() {
            return self
                .s
                .unsupported(135, format!("bus bit characters {open:?}{close:?}"));
        }
        self.header.bus_bits = Some((open, close));
        self.apply_header();
        Ok(())
    }

    fn design(&mut self, name: &str) -> CallbackResult {
        if self.s.block.is_some() {
            self.s.report(
                106,
                IssueKind::Structural,
                format!("second DESIGN statement {name}"),
            );
            return Err(Abort);
        }
        let block = match self.target {
            Target::Chip => self.design_chip(name)?,
            Target::Child(parent) => self.design_child(parent, name)?,
            Target::Wires(block) => {
                let current = &self.s.db.block(block).name;
                if current != name {
                    let message = format!("design {name} is read into block {current}");
                    self.s.report(105, IssueKind::Note, message);
                }
                block
            }
        };
        tracing::info!(design = name, "reading design");
        self.s.block = Some(block);
        self.apply_header();
        Ok(())
    }

    fn technology(&mut self, name: &str) -> CallbackResult {
        let tech = &self.s.tech().name;
        if tech != name {
            let message = format!("design technology {name} differs from {tech}");
            self.s.report(131, IssueKind::Note, message);
        }
        Ok(())
    }

    fn units(&mut self, units: u32) -> CallbackResult {
        let dbu = self.s.tech().dbu_per_micron;
        if units == 0 || units > dbu {
            self.s.unsupported(
                130,
                format!("DEF units {units} per micron exceed database units {dbu} per micron"),
            )?;
            let kept = self.s.units.def_units();
            self.s.report(
                138,
                IssueKind::Note,
                format!("distances are read at {kept} DEF units per micron instead of {units}"),
            );
            return Ok(());
        }
        self.s.units = Units::new(dbu, units);
        self.header.def_units = Some(units);
        self.apply_header();
        Ok(())
    }

    fn property_definition(&mut self, def: PropertyDefinition) -> CallbackResult {
        let block = self.s.check_block()?;
        self.props.build(&mut self.s, block, def)
    }

    fn die_area(&mut self, area: DieArea) -> CallbackResult {
        let block = self.s.check_block()?;
        self.floorplan.die_area(&mut self.s, block, area)
    }

    fn row(&mut self, row: Row) -> CallbackResult {
        let block = self.s.check_block()?;
        self.floorplan.row(&mut self.s, block, row)
    }

    fn tracks(&mut self, tracks: Tracks) -> CallbackResult {
        let block = self.s.check_block()?;
        self.floorplan.tracks(&mut self.s, block, tracks)
    }

    fn gcell_grid(&mut self, grid: GcellGrid) -> CallbackResult {
        let block = self.s.check_block()?;
        self.floorplan.gcell_grid(&mut self.s, block, grid)
    }

    fn via(&mut self, via: Via) -> CallbackResult {
        let block = self.s.check_block()?;
        self.vias.build(&mut self.s, block, via)
    }

    fn non_default_rule(&mut self, rule: NonDefaultRule) -> CallbackResult {
        let block = self.s.check_block()?;
        self.ndrs.build(&mut self.s, block, rule)
    }

    fn region(&mut self, region: Region) -> CallbackResult {
        let block = self.s.check_block()?;
        self.regions.region(&mut self.s, block, region)
    }

    fn component(&mut self, component: Component) -> CallbackResult {
        let block = self.s.check_block()?;
        self.components.build(&mut self.s, block, component)
    }

    fn pin(&mut self, pin: Pin) -> CallbackResult {
        let block = self.s.check_block()?;
        self.pins.build(&mut self.s, block, pin)
    }

    fn pin_properties(&mut self, props: PinProperties) -> CallbackResult {
        let block = self.s.check_block()?;
        self.pins.properties(&mut self.s, block, props)
    }

    fn blockage(&mut self, blockage: Blockage) -> CallbackResult {
        let block = self.s.check_block()?;
        self.blockages.blockage(&mut self.s, block, blockage)
    }

    fn slots(&mut self, count: u32) -> CallbackResult {
        self.s.check_block()?;
        if count > 0 {
            return self.s.unsupported(134, "SLOTS");
        }
        Ok(())
    }

    fn fill(&mut self, fill: Fill) -> CallbackResult {
        let block = self.s.check_block()?;
        self.blockages.fill(&mut self.s, block, fill)
    }

    fn styles(&mut self, count: u32) -> CallbackResult {
        self.s.check_block()?;
        if count > 0 {
            return self.s.unsupported(132, "STYLES");
        }
        Ok(())
    }

    fn special_net(&mut self, net: SpecialNet) -> CallbackResult {
        let block = self.s.check_block()?;
        self.snets.build(&mut self.s, block, net)
    }

    fn net(&mut self, net: Net) -> CallbackResult {
        let block = self.s.check_block()?;
        self.nets.build(&mut self.s, block, net)
    }

    fn group(&mut self, group: Group) -> CallbackResult {
        let block = self.s.check_block()?;
        self.regions.group(&mut self.s, block, group)
    }

    fn design_end(&mut self) -> CallbackResult {
        tracing::debug!("END DESIGN");
        Ok(())
    }
}

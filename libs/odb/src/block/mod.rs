//! Blocks: the netlist, placement and routing of one design.

use std::io::{Read, Write};

use geometry::prelude::*;

use crate::error::Result;
use crate::hash::HashTable;
use crate::id::Id;
use crate::object::{ObjectTable, ObjectType};
use crate::prop::{Property, PropertyScope};
use crate::rule::RuleSet;
use crate::stream::{IStream, OStream, Persist, SchemaRev};
use crate::table::Table;
use crate::tech::Tech;
use crate::Chip;

mod floorplan;
mod inst;
mod net;
mod via;
mod wire;

#[cfg(test)]
mod tests;

pub use floorplan::{
    Blockage, Fill, GCellGrid, GridPattern, Group, Obstruction, PropKind, PropTarget,
    PropertyDefinition, Region, RegionKind, Row, RowDirection, SiteRef, TrackGrid,
};
pub use inst::{ITerm, Inst, InstNames, MasterRef, PlacementStatus, Source};
pub use net::{
    BPin, BTerm, BTermBPins, BTermNames, Net, NetBTerms, NetFlags, NetITerms, NetNames,
    NetSWires, PinBox, RuleRef, WireType,
};
pub use via::{Via, ViaNames, ViaRef};
pub use wire::{
    create_box, SBox, SBoxShape, SWire, SWireSBoxes, Wire, WireEncoder, WireOp, WireShapeType,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub chip: Id<Chip>,
    pub parent: Option<Id<Block>>,
    pub(crate) children: Vec<Id<Block>>,
    pub tech: Id<Tech>,
    /// Database units per micron, taken from the technology.
    pub dbu_per_micron: u32,
    /// The distance units per micron of the design this block was read from.
    pub def_units: u32,
    pub die_area: Polygon,
    pub divider: u8,
    pub bus_delimiters: (u8, u8),
    gcell_grid: Option<GCellGrid>,
    insts: Table<Inst>,
    inst_names: HashTable<InstNames>,
    iterms: Table<ITerm>,
    nets: Table<Net>,
    net_names: HashTable<NetNames>,
    bterms: Table<BTerm>,
    bterm_names: HashTable<BTermNames>,
    bpins: Table<BPin>,
    wires: Table<Wire>,
    swires: Table<SWire>,
    sboxes: Table<SBox>,
    vias: Table<Via>,
    via_names: HashTable<ViaNames>,
    rows: Table<Row>,
    track_grids: Table<TrackGrid>,
    regions: Table<Region>,
    groups: Table<Group>,
    blockages: Table<Blockage>,
    obstructions: Table<Obstruction>,
    fills: Table<Fill>,
    prop_defs: Table<PropertyDefinition>,
    pub rules: RuleSet,
    props: Table<Property>,
}

impl Block {
    pub(crate) fn new(
        name: impl Into<String>,
        chip: Id<Chip>,
        parent: Option<Id<Block>>,
        tech: Id<Tech>,
        dbu_per_micron: u32,
    ) -> Self {
        Self {
            name: name.into(),
            chip,
            parent,
            children: Vec::new(),
            tech,
            dbu_per_micron,
            def_units: dbu_per_micron,
            die_area: Polygon::default(),
            divider: b'/',
            bus_delimiters: (b'[', b']'),
            gcell_grid: None,
            insts: Table::new(),
            inst_names: HashTable::new(),
            iterms: Table::new(),
            nets: Table::new(),
            net_names: HashTable::new(),
            bterms: Table::new(),
            bterm_names: HashTable::new(),
            bpins: Table::new(),
            wires: Table::new(),
            swires: Table::new(),
            sboxes: Table::new(),
            vias: Table::new(),
            via_names: HashTable::new(),
            rows: Table::new(),
            track_grids: Table::new(),
            regions: Table::new(),
            groups: Table::new(),
            blockages: Table::new(),
            obstructions: Table::new(),
            fills: Table::new(),
            prop_defs: Table::new(),
            rules: RuleSet::default(),
            props: Table::new(),
        }
    }

    pub fn children(&self) -> &[Id<Block>] {
        &self.children
    }

    /// The bounding box of the die area.
    pub fn die_bbox(&self) -> Option<Rect> {
        self.die_area.bbox()
    }
}

impl PropertyScope for Block {
    fn object_table(&self, kind: ObjectType) -> Option<&dyn ObjectTable> {
        match kind {
            ObjectType::Inst => Some(&self.insts),
            ObjectType::ITerm => Some(&self.iterms),
            ObjectType::Net => Some(&self.nets),
            ObjectType::BTerm => Some(&self.bterms),
            ObjectType::BPin => Some(&self.bpins),
            ObjectType::Wire => Some(&self.wires),
            ObjectType::SWire => Some(&self.swires),
            ObjectType::SBox => Some(&self.sboxes),
            ObjectType::Via => Some(&self.vias),
            ObjectType::Row => Some(&self.rows),
            ObjectType::TrackGrid => Some(&self.track_grids),
            ObjectType::Region => Some(&self.regions),
            ObjectType::Group => Some(&self.groups),
            ObjectType::Blockage => Some(&self.blockages),
            ObjectType::Obstruction => Some(&self.obstructions),
            ObjectType::Fill => Some(&self.fills),
            ObjectType::PropertyDefinition => Some(&self.prop_defs),
            ObjectType::NonDefaultRule => Some(&self.rules.ndrs),
            ObjectType::LayerRule => Some(&self.rules.layer_rules),
            ObjectType::Property => Some(&self.props),
            ObjectType::Tech
            | ObjectType::Lib
            | ObjectType::Chip
            | ObjectType::Block
            | ObjectType::TechLayer
            | ObjectType::TechVia
            | ObjectType::ViaGenerateRule
            | ObjectType::Site
            | ObjectType::Master
            | ObjectType::MTerm => None,
        }
    }

    fn object_table_mut(&mut self, kind: ObjectType) -> Option<&mut dyn ObjectTable> {
        match kind {
            ObjectType::Inst => Some(&mut self.insts),
            ObjectType::ITerm => Some(&mut self.iterms),
            ObjectType::Net => Some(&mut self.nets),
            ObjectType::BTerm => Some(&mut self.bterms),
            ObjectType::BPin => Some(&mut self.bpins),
            ObjectType::Wire => Some(&mut self.wires),
            ObjectType::SWire => Some(&mut self.swires),
            ObjectType::SBox => Some(&mut self.sboxes),
            ObjectType::Via => Some(&mut self.vias),
            ObjectType::Row => Some(&mut self.rows),
            ObjectType::TrackGrid => Some(&mut self.track_grids),
            ObjectType::Region => Some(&mut self.regions),
            ObjectType::Group => Some(&mut self.groups),
            ObjectType::Blockage => Some(&mut self.blockages),
            ObjectType::Obstruction => Some(&mut self.obstructions),
            ObjectType::Fill => Some(&mut self.fills),
            ObjectType::PropertyDefinition => Some(&mut self.prop_defs),
            ObjectType::NonDefaultRule => Some(&mut self.rules.ndrs),
            ObjectType::LayerRule => Some(&mut self.rules.layer_rules),
            ObjectType::Property => Some(&mut self.props),
            ObjectType::Tech
            | ObjectType::Lib
            | ObjectType::Chip
            | ObjectType::Block
            | ObjectType::TechLayer
            | ObjectType::TechVia
            | ObjectType::ViaGenerateRule
            | ObjectType::Site
            | ObjectType::Master
            | ObjectType::MTerm => None,
        }
    }

    fn properties(&self) -> &Table<Property> {
        &self.props
    }

    fn properties_mut(&mut self) -> &mut Table<Property> {
        &mut self.props
    }
}

impl Persist for Block {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.name.write(s)?;
        self.chip.write(s)?;
        self.parent.write(s)?;
        self.children.write(s)?;
        self.tech.write(s)?;
        self.dbu_per_micron.write(s)?;
        self.def_units.write(s)?;
        self.die_area.write(s)?;
        self.divider.write(s)?;
        self.bus_delimiters.write(s)?;
        if s.is_schema(SchemaRev::BlockGCellGrid) {
            self.gcell_grid.write(s)?;
        }
        self.insts.write(s)?;
        self.inst_names.write(s)?;
        self.iterms.write(s)?;
        self.nets.write(s)?;
        self.net_names.write(s)?;
        self.bterms.write(s)?;
        self.bterm_names.write(s)?;
        self.bpins.write(s)?;
        self.wires.write(s)?;
        self.swires.write(s)?;
        self.sboxes.write(s)?;
        self.vias.write(s)?;
        self.via_names.write(s)?;
        self.rows.write(s)?;
        self.track_grids.write(s)?;
        self.regions.write(s)?;
        self.groups.write(s)?;
        self.blockages.write(s)?;
        self.obstructions.write(s)?;
        self.fills.write(s)?;
        self.prop_defs.write(s)?;
        self.rules.write(s)?;
        self.props.write(s)
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let name = String::read(s)?;
        let chip = Id::read(s)?;
        let parent = Option::read(s)?;
        let children = Vec::read(s)?;
        let tech = Id::read(s)?;
        let dbu_per_micron = u32::read(s)?;
        let def_units = u32::read(s)?;
        let die_area = Polygon::read(s)?;
        let divider = u8::read(s)?;
        let bus_delimiters = <(u8, u8)>::read(s)?;
        let gcell_grid = if s.is_schema(SchemaRev::BlockGCellGrid) {
            Option::read(s)?
        } else {
            None
        };
        Ok(Self {
            name,
            chip,
            parent,
            children,
            tech,
            dbu_per_micron,
            def_units,
            die_area,
            divider,
            bus_delimiters,
            gcell_grid,
            insts: Table::read(s)?,
            inst_names: HashTable::read(s)?,
            iterms: Table::read(s)?,
            nets: Table::read(s)?,
            net_names: HashTable::read(s)?,
            bterms: Table::read(s)?,
            bterm_names: HashTable::read(s)?,
            bpins: Table::read(s)?,
            wires: Table::read(s)?,
            swires: Table::read(s)?,
            sboxes: Table::read(s)?,
            vias: Table::read(s)?,
            via_names: HashTable::read(s)?,
            rows: Table::read(s)?,
            track_grids: Table::read(s)?,
            regions: Table::read(s)?,
            groups: Table::read(s)?,
            blockages: Table::read(s)?,
            obstructions: Table::read(s)?,
            fills: Table::read(s)?,
            prop_defs: Table::read(s)?,
            rules: RuleSet::read(s)?,
            props: Table::read(s)?,
        })
    }
}

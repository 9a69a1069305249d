//! Floorplan objects: rows, track and gcell grids, regions, groups,
//! blockages, obstructions, fills and property definitions.

use std::io::{Read, Write};

use geometry::prelude::*;

use crate::error::Result;
use crate::id::Id;
use crate::library::{Lib, Site};
use crate::object::impl_object;
use crate::prop::{PropValue, PropertyScope};
use crate::stream::{persist_enum, persist_fields, IStream, OStream, Persist, SchemaRev};
use crate::tech::TechLayer;

use super::inst::Inst;
use super::Block;

/// A site in a specific library.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SiteRef {
    pub lib: Id<Lib>,
    pub site: Id<Site>,
}

persist_fields!(SiteRef { lib, site });

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum RowDirection {
    #[default]
    Horizontal,
    Vertical,
}

persist_enum!(RowDirection {
    Horizontal = 0,
    Vertical = 1,
});

/// A row of placement sites.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub site: SiteRef,
    pub origin: Point,
    pub orient: NamedOrientation,
    pub direction: RowDirection,
    pub num_sites: u32,
    /// The distance between adjacent sites.
    pub spacing: i64,
}

/// A sequence of evenly spaced grid lines.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GridPattern {
    pub start: i64,
    pub num: u32,
    pub step: i64,
    /// The mask of the first line, or 0 if uncolored.
    pub first_mask: u32,
}

/// The routing tracks of one layer.
///
/// `x` holds patterns of vertical tracks at x positions, `y` of horizontal
/// tracks at y positions.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackGrid {
    pub layer: Id<TechLayer>,
    pub x: Vec<GridPattern>,
    pub y: Vec<GridPattern>,
}

/// The global routing cell grid of a block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GCellGrid {
    pub x: Vec<GridPattern>,
    pub y: Vec<GridPattern>,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum RegionKind {
    #[default]
    Inclusive,
    Exclusive,
    Suggested,
}

persist_enum!(RegionKind {
    Inclusive = 0,
    Exclusive = 1,
    Suggested = 2,
});

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub kind: RegionKind,
    pub boxes: Vec<Rect>,
}

impl Persist for Region {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.name.write(s)?;
        if s.is_schema(SchemaRev::RegionType) {
            self.kind.write(s)?;
        }
        self.boxes.write(s)
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let name = String::read(s)?;
        let kind = if s.is_schema(SchemaRev::RegionType) {
            RegionKind::read(s)?
        } else {
            RegionKind::default()
        };
        Ok(Self {
            name,
            kind,
            boxes: Vec::read(s)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub region: Option<Id<Region>>,
    pub(crate) insts: Vec<Id<Inst>>,
}

impl Group {
    pub fn insts(&self) -> &[Id<Inst>] {
        &self.insts
    }
}

/// A placement blockage.
#[derive(Debug, Clone, PartialEq)]
pub struct Blockage {
    pub bbox: Rect,
    pub inst: Option<Id<Inst>>,
    pub soft: bool,
    /// The maximum placement density within the blockage, in percent.
    pub max_density: f64,
    pub pushed_down: bool,
}

/// A routing blockage on one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstruction {
    pub layer: Id<TechLayer>,
    pub bbox: Rect,
    pub inst: Option<Id<Inst>>,
    pub slot: bool,
    pub fill: bool,
    pub pushed_down: bool,
    pub except_pg_net: bool,
    pub min_spacing: Option<i64>,
    pub effective_width: Option<i64>,
    pub mask: u32,
}

/// A metal fill shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub layer: Id<TechLayer>,
    pub rect: Rect,
    pub mask: u32,
    pub opc: bool,
}

/// The kind of object a property definition applies to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PropTarget {
    Design,
    Component,
    Net,
    SpecialNet,
    Group,
    Row,
    ComponentPin,
    Region,
    NonDefaultRule,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PropKind {
    Integer,
    Real,
    String,
}

persist_enum!(PropTarget {
    Design = 0,
    Component = 1,
    Net = 2,
    SpecialNet = 3,
    Group = 4,
    Row = 5,
    ComponentPin = 6,
    Region = 7,
    NonDefaultRule = 8,
});
persist_enum!(PropKind {
    Integer = 0,
    Real = 1,
    String = 2,
});

/// The declared type of a named property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub target: PropTarget,
    pub name: String,
    pub kind: PropKind,
    pub range: Option<(f64, f64)>,
    pub default: Option<PropValue>,
}

persist_fields!(Row {
    name,
    site,
    origin,
    orient,
    direction,
    num_sites,
    spacing,
});
persist_fields!(GridPattern {
    start,
    num,
    step,
    first_mask,
});
persist_fields!(TrackGrid { layer, x, y });
persist_fields!(GCellGrid { x, y });
persist_fields!(Group {
    name,
    region,
    insts,
});
persist_fields!(Blockage {
    bbox,
    inst,
    soft,
    max_density,
    pushed_down,
});
persist_fields!(Obstruction {
    layer,
    bbox,
    inst,
    slot,
    fill,
    pushed_down,
    except_pg_net,
    min_spacing,
    effective_width,
    mask,
});
persist_fields!(Fill {
    layer,
    rect,
    mask,
    opc,
});
persist_fields!(PropertyDefinition {
    target,
    name,
    kind,
    range,
    default,
});

impl_object!(
    Row,
    TrackGrid,
    Region,
    Group,
    Blockage,
    Obstruction,
    Fill,
    PropertyDefinition,
);

impl Block {
    pub fn create_row(&mut self, row: Row) -> Id<Row> {
        self.rows.create(row)
    }

    pub fn row(&self, id: Id<Row>) -> &Row {
        self.rows.get(id)
    }

    pub fn rows(&self) -> impl Iterator<Item = (Id<Row>, &Row)> + '_ {
        self.rows.iter()
    }

    pub fn destroy_row(&mut self, id: Id<Row>) {
        self.destroy_properties(id.into());
        self.rows.destroy(id);
    }

    /// Creates the track grid of `layer`. Returns `None` if it already has one.
    pub fn create_track_grid(&mut self, layer: Id<TechLayer>) -> Option<Id<TrackGrid>> {
        if self.find_track_grid(layer).is_some() {
            return None;
        }
        Some(self.track_grids.create(TrackGrid {
            layer,
            x: Vec::new(),
            y: Vec::new(),
        }))
    }

    pub fn find_track_grid(&self, layer: Id<TechLayer>) -> Option<Id<TrackGrid>> {
        self.track_grids
            .iter()
            .find(|(_, g)| g.layer == layer)
            .map(|(id, _)| id)
    }

    pub fn track_grid(&self, id: Id<TrackGrid>) -> &TrackGrid {
        self.track_grids.get(id)
    }

    pub fn track_grid_mut(&mut self, id: Id<TrackGrid>) -> &mut TrackGrid {
        self.track_grids.get_mut(id)
    }

    pub fn track_grids(&self) -> impl Iterator<Item = (Id<TrackGrid>, &TrackGrid)> + '_ {
        self.track_grids.iter()
    }

    pub fn destroy_track_grid(&mut self, id: Id<TrackGrid>) {
        self.destroy_properties(id.into());
        self.track_grids.destroy(id);
    }

    pub fn gcell_grid(&self) -> Option<&GCellGrid> {
        self.gcell_grid.as_ref()
    }

    pub fn gcell_grid_mut(&mut self) -> &mut GCellGrid {
        self.gcell_grid.get_or_insert_with(GCellGrid::default)
    }

    pub fn clear_gcell_grid(&mut self) {
        self.gcell_grid = None;
    }

    /// Creates an empty region. Returns `None` if the name is taken.
    pub fn create_region(&mut self, name: &str) -> Option<Id<Region>> {
        if self.find_region(name).is_some() {
            return None;
        }
        Some(self.regions.create(Region {
            name: name.to_string(),
            kind: RegionKind::default(),
            boxes: Vec::new(),
        }))
    }

    pub fn find_region(&self, name: &str) -> Option<Id<Region>> {
        self.regions
            .iter()
            .find(|(_, r)| r.name == name)
            .map(|(id, _)| id)
    }

    pub fn region(&self, id: Id<Region>) -> &Region {
        self.regions.get(id)
    }

    pub fn region_mut(&mut self, id: Id<Region>) -> &mut Region {
        self.regions.get_mut(id)
    }

    pub fn regions(&self) -> impl Iterator<Item = (Id<Region>, &Region)> + '_ {
        self.regions.iter()
    }

    /// Creates an empty group. Returns `None` if the name is taken.
    pub fn create_group(&mut self, name: &str) -> Option<Id<Group>> {
        if self.find_group(name).is_some() {
            return None;
        }
        Some(self.groups.create(Group {
            name: name.to_string(),
            region: None,
            insts: Vec::new(),
        }))
    }

    pub fn find_group(&self, name: &str) -> Option<Id<Group>> {
        self.groups
            .iter()
            .find(|(_, g)| g.name == name)
            .map(|(id, _)| id)
    }

    pub fn group(&self, id: Id<Group>) -> &Group {
        self.groups.get(id)
    }

    pub fn group_mut(&mut self, id: Id<Group>) -> &mut Group {
        self.groups.get_mut(id)
    }

    pub fn groups(&self) -> impl Iterator<Item = (Id<Group>, &Group)> + '_ {
        self.groups.iter()
    }

    /// Moves `inst` into `group`, removing it from any previous group.
    pub fn add_group_inst(&mut self, group: Id<Group>, inst: Id<Inst>) {
        if let Some(old) = self.insts.get(inst).group {
            if old == group {
                return;
            }
            self.groups.get_mut(old).insts.retain(|&i| i != inst);
        }
        self.groups.get_mut(group).insts.push(inst);
        self.insts.get_mut(inst).group = Some(group);
    }

    pub fn create_blockage(&mut self, bbox: Rect) -> Id<Blockage> {
        self.blockages.create(Blockage {
            bbox,
            inst: None,
            soft: false,
            max_density: 0.0,
            pushed_down: false,
        })
    }

    pub fn blockage_mut(&mut self, id: Id<Blockage>) -> &mut Blockage {
        self.blockages.get_mut(id)
    }

    pub fn blockages(&self) -> impl Iterator<Item = (Id<Blockage>, &Blockage)> + '_ {
        self.blockages.iter()
    }

    pub fn create_obstruction(&mut self, layer: Id<TechLayer>, bbox: Rect) -> Id<Obstruction> {
        self.obstructions.create(Obstruction {
            layer,
            bbox,
            inst: None,
            slot: false,
            fill: false,
            pushed_down: false,
            except_pg_net: false,
            min_spacing: None,
            effective_width: None,
            mask: 0,
        })
    }

    pub fn obstruction_mut(&mut self, id: Id<Obstruction>) -> &mut Obstruction {
        self.obstructions.get_mut(id)
    }

    pub fn obstructions(&self) -> impl Iterator<Item = (Id<Obstruction>, &Obstruction)> + '_ {
        self.obstructions.iter()
    }

    pub fn create_fill(&mut self, layer: Id<TechLayer>, rect: Rect, mask: u32, opc: bool) -> Id<Fill> {
        self.fills.create(Fill {
            layer,
            rect,
            mask,
            opc,
        })
    }

    pub fn fills(&self) -> impl Iterator<Item = (Id<Fill>, &Fill)> + '_ {
        self.fills.iter()
    }

    /// Declares a property. Returns `None` if `name` is already declared for `target`.
    pub fn create_property_definition(
        &mut self,
        target: PropTarget,
        name: &str,
        kind: PropKind,
    ) -> Option<Id<PropertyDefinition>> {
        if self.find_property_definition(target, name).is_some() {
            return None;
        }
        Some(self.prop_defs.create(PropertyDefinition {
            target,
            name: name.to_string(),
            kind,
            range: None,
            default: None,
        }))
    }

    pub fn find_property_definition(
        &self,
        target: PropTarget,
        name: &str,
    ) -> Option<Id<PropertyDefinition>> {
        self.prop_defs
            .iter()
            .find(|(_, d)| d.target == target && d.name == name)
            .map(|(id, _)| id)
    }

    pub fn property_definition(&self, id: Id<PropertyDefinition>) -> &PropertyDefinition {
        self.prop_defs.get(id)
    }

    pub fn property_definition_mut(
        &mut self,
        id: Id<PropertyDefinition>,
    ) -> &mut PropertyDefinition {
        self.prop_defs.get_mut(id)
    }
}

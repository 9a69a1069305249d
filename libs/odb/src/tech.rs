//! Technologies: layers, vias, via rules and non-default rules.

use std::io::{Read, Write};

use bitflags::bitflags;
use geometry::prelude::*;

use crate::error::Result;
use crate::hash::{hash_index, HashTable};
use crate::id::Id;
use crate::object::{impl_object, ObjectTable, ObjectType};
use crate::prop::{Property, PropertyScope};
use crate::rule::RuleSet;
use crate::stream::{
    persist_enum, persist_fields, persist_flags, IStream, OStream, Persist, SchemaRev,
};
use crate::table::Table;
use crate::via::{ViaBox, ViaParams};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum LayerKind {
    #[default]
    Routing,
    Cut,
    Masterslice,
    Overlap,
    Implant,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum LayerDirection {
    #[default]
    None,
    Horizontal,
    Vertical,
}

persist_enum!(LayerKind {
    Routing = 0,
    Cut = 1,
    Masterslice = 2,
    Overlap = 3,
    Implant = 4,
});
persist_enum!(LayerDirection {
    None = 0,
    Horizontal = 1,
    Vertical = 2,
});

bitflags! {
    /// Boolean layer rules, stored as one `u32`.
    ///
    /// Bit positions are part of the stream format and must not change.
    #[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
    pub struct LayerFlags: u32 {
        const RECT_ONLY = 1 << 0;
        const RECT_ONLY_EXCEPT_NON_CORE_PINS = 1 << 1;
        const RIGHT_WAY_ON_GRID_ONLY = 1 << 2;
        const RIGHT_WAY_ON_GRID_ONLY_CHECK_MASK = 1 << 3;
        const MASKED = 1 << 4;
    }
}

persist_flags!(LayerFlags);

#[derive(Debug, Clone, PartialEq)]
pub struct TechLayer {
    pub name: String,
    /// The position of this layer in the stack, from 0.
    pub number: u32,
    pub kind: LayerKind,
    pub direction: LayerDirection,
    /// The 1-based routing level of a routing layer; 0 otherwise.
    pub routing_level: u32,
    pub width: i64,
    pub spacing: i64,
    pub pitch: i64,
    pub num_masks: u32,
    pub flags: LayerFlags,
    name_next: Option<Id<TechLayer>>,
    number_next: Option<Id<TechLayer>>,
}

persist_fields!(TechLayer {
    name,
    number,
    kind,
    direction,
    routing_level,
    width,
    spacing,
    pitch,
    num_masks,
    flags,
    name_next,
    number_next,
});

#[derive(Debug, Clone, PartialEq)]
pub struct TechVia {
    pub name: String,
    pub is_default: bool,
    pub boxes: Vec<ViaBox>,
    pub params: Option<ViaParams>,
    pub generate_rule: Option<Id<ViaGenerateRule>>,
    pub pattern: Option<String>,
    name_next: Option<Id<TechVia>>,
}

impl TechVia {
    /// The lowest and highest layers holding a shape of this via.
    pub fn layer_range(&self, tech: &Tech) -> Option<(Id<TechLayer>, Id<TechLayer>)> {
        via_layer_range(tech, self.boxes.iter().map(|b| b.layer))
    }
}

/// The lowest and highest of `layers` by layer number.
pub(crate) fn via_layer_range(
    tech: &Tech,
    layers: impl Iterator<Item = Id<TechLayer>>,
) -> Option<(Id<TechLayer>, Id<TechLayer>)> {
    let mut layers: Vec<_> = layers.collect();
    layers.sort_by_key(|&l| tech.layer(l).number);
    Some((*layers.first()?, *layers.last()?))
}

/// One layer of a via generate rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ViaRuleLayer {
    pub layer: Id<TechLayer>,
    pub enclosure: (i64, i64),
    /// For cut layers, the cut shape.
    pub rect: Option<Rect>,
    /// For cut layers, the center-to-center cut spacing.
    pub spacing: (i64, i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViaGenerateRule {
    pub name: String,
    pub is_default: bool,
    pub layers: Vec<ViaRuleLayer>,
}

impl Persist for TechVia {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.name.write(s)?;
        self.is_default.write(s)?;
        self.boxes.write(s)?;
        if s.is_schema(SchemaRev::ViaParams) {
            self.params.write(s)?;
        }
        self.generate_rule.write(s)?;
        self.pattern.write(s)?;
        self.name_next.write(s)
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let name = String::read(s)?;
        let is_default = bool::read(s)?;
        let boxes = Vec::read(s)?;
        let params = if s.is_schema(SchemaRev::ViaParams) {
            Option::read(s)?
        } else {
            None
        };
        Ok(Self {
            name,
            is_default,
            boxes,
            params,
            generate_rule: Option::read(s)?,
            pattern: Option::read(s)?,
            name_next: Option::read(s)?,
        })
    }
}

persist_fields!(ViaRuleLayer {
    layer,
    enclosure,
    rect,
    spacing,
});
persist_fields!(ViaGenerateRule {
    name,
    is_default,
    layers,
});

impl_object!(TechLayer, TechVia, ViaGenerateRule);

hash_index!(LayerNames, TechLayer, str, name, name_next);
hash_index!(LayerNumbers, TechLayer, u32, number, number_next);
hash_index!(TechViaNames, TechVia, str, name, name_next);

#[derive(Debug, Clone, PartialEq)]
pub struct Tech {
    pub name: String,
    pub dbu_per_micron: u32,
    pub manufacturing_grid: i64,
    layers: Table<TechLayer>,
    layer_names: HashTable<LayerNames>,
    layer_numbers: HashTable<LayerNumbers>,
    vias: Table<TechVia>,
    via_names: HashTable<TechViaNames>,
    via_rules: Table<ViaGenerateRule>,
    pub rules: RuleSet,
    props: Table<Property>,
}

persist_fields!(Tech {
    name,
    dbu_per_micron,
    manufacturing_grid,
    layers,
    layer_names,
    layer_numbers,
    vias,
    via_names,
    via_rules,
    rules,
    props,
});

impl Tech {
    pub fn new(name: impl Into<String>, dbu_per_micron: u32) -> Self {
        Self {
            name: name.into(),
            dbu_per_micron,
            manufacturing_grid: 0,
            layers: Table::new(),
            layer_names: HashTable::new(),
            layer_numbers: HashTable::new(),
            vias: Table::new(),
            via_names: HashTable::new(),
            via_rules: Table::new(),
            rules: RuleSet::default(),
            props: Table::new(),
        }
    }

    /// Adds a layer on top of the stack. Returns `None` if the name is taken.
    pub fn create_layer(&mut self, name: &str, kind: LayerKind) -> Option<Id<TechLayer>> {
        if self.find_layer(name).is_some() {
            return None;
        }
        let number = self.layers.len() as u32;
        let routing_level = if kind == LayerKind::Routing {
            self.layers
                .iter()
                .filter(|(_, l)| l.kind == LayerKind::Routing)
                .count() as u32
                + 1
        } else {
            0
        };
        let id = self.layers.create(TechLayer {
            name: name.to_string(),
            number,
            kind,
            direction: LayerDirection::None,
            routing_level,
            width: 0,
            spacing: 0,
            pitch: 0,
            num_masks: 1,
            flags: LayerFlags::empty(),
            name_next: None,
            number_next: None,
        });
        self.layer_names.insert(&mut self.layers, id);
        self.layer_numbers.insert(&mut self.layers, id);
        Some(id)
    }

    pub fn find_layer(&self, name: &str) -> Option<Id<TechLayer>> {
        self.layer_names.find(&self.layers, name)
    }

    pub fn find_layer_by_number(&self, number: u32) -> Option<Id<TechLayer>> {
        self.layer_numbers.find(&self.layers, &number)
    }

    pub fn find_routing_layer(&self, level: u32) -> Option<Id<TechLayer>> {
        self.layers
            .iter()
            .find(|(_, l)| l.routing_level == level && l.kind == LayerKind::Routing)
            .map(|(id, _)| id)
    }

    pub fn layer(&self, id: Id<TechLayer>) -> &TechLayer {
        self.layers.get(id)
    }

    pub fn layer_mut(&mut self, id: Id<TechLayer>) -> &mut TechLayer {
        self.layers.get_mut(id)
    }

    /// Layers from the bottom of the stack up.
    pub fn layers(&self) -> impl Iterator<Item = (Id<TechLayer>, &TechLayer)> + '_ {
        self.layers.iter()
    }

    pub fn num_routing_layers(&self) -> usize {
        self.layers
            .iter()
            .filter(|(_, l)| l.kind == LayerKind::Routing)
            .count()
    }

    /// Adds a via. Returns `None` if the name is taken.
    pub fn create_via(&mut self, name: &str, boxes: Vec<ViaBox>) -> Option<Id<TechVia>> {
        if self.find_via(name).is_some() {
            return None;
        }
        let id = self.vias.create(TechVia {
            name: name.to_string(),
            is_default: false,
            boxes,
            params: None,
            generate_rule: None,
            pattern: None,
            name_next: None,
        });
        self.via_names.insert(&mut self.vias, id);
        Some(id)
    }

    pub fn find_via(&self, name: &str) -> Option<Id<TechVia>> {
        self.via_names.find(&self.vias, name)
    }

    pub fn via(&self, id: Id<TechVia>) -> &TechVia {
        self.vias.get(id)
    }

    pub fn via_mut(&mut self, id: Id<TechVia>) -> &mut TechVia {
        self.vias.get_mut(id)
    }

    pub fn vias(&self) -> impl Iterator<Item = (Id<TechVia>, &TechVia)> + '_ {
        self.vias.iter()
    }

    pub fn create_via_rule(
        &mut self,
        name: &str,
        layers: Vec<ViaRuleLayer>,
    ) -> Option<Id<ViaGenerateRule>> {
        if self.find_via_rule(name).is_some() {
            return None;
        }
        Some(self.via_rules.create(ViaGenerateRule {
            name: name.to_string(),
            is_default: false,
            layers,
        }))
    }

    pub fn find_via_rule(&self, name: &str) -> Option<Id<ViaGenerateRule>> {
        self.via_rules
            .iter()
            .find(|(_, r)| r.name == name)
            .map(|(id, _)| id)
    }

    pub fn via_rule(&self, id: Id<ViaGenerateRule>) -> &ViaGenerateRule {
        self.via_rules.get(id)
    }
}

impl PropertyScope for Tech {
    fn object_table(&self, kind: ObjectType) -> Option<&dyn ObjectTable> {
        match kind {
            ObjectType::TechLayer => Some(&self.layers),
            ObjectType::TechVia => Some(&self.vias),
            ObjectType::ViaGenerateRule => Some(&self.via_rules),
            ObjectType::NonDefaultRule => Some(&self.rules.ndrs),
            ObjectType::LayerRule => Some(&self.rules.layer_rules),
            ObjectType::Property => Some(&self.props),
            ObjectType::Tech
            | ObjectType::Lib
            | ObjectType::Chip
            | ObjectType::Block
            | ObjectType::Site
            | ObjectType::Master
            | ObjectType::MTerm
            | ObjectType::Inst
            | ObjectType::ITerm
            | ObjectType::Net
            | ObjectType::BTerm
            | ObjectType::BPin
            | ObjectType::Wire
            | ObjectType::SWire
            | ObjectType::SBox
            | ObjectType::Via
            | ObjectType::Row
            | ObjectType::TrackGrid
            | ObjectType::Region
            | ObjectType::Group
            | ObjectType::Blockage
            | ObjectType::Obstruction
            | ObjectType::Fill
            | ObjectType::PropertyDefinition => None,
        }
    }

    fn object_table_mut(&mut self, kind: ObjectType) -> Option<&mut dyn ObjectTable> {
        match kind {
            ObjectType::TechLayer => Some(&mut self.layers),
            ObjectType::TechVia => Some(&mut self.vias),
            ObjectType::ViaGenerateRule => Some(&mut self.via_rules),
            ObjectType::NonDefaultRule => Some(&mut self.rules.ndrs),
            ObjectType::LayerRule => Some(&mut self.rules.layer_rules),
            ObjectType::Property => Some(&mut self.props),
            ObjectType::Tech
            | ObjectType::Lib
            | ObjectType::Chip
            | ObjectType::Block
            | ObjectType::Site
            | ObjectType::Master
            | ObjectType::MTerm
            | ObjectType::Inst
            | ObjectType::ITerm
            | ObjectType::Net
            | ObjectType::BTerm
            | ObjectType::BPin
            | ObjectType::Wire
            | ObjectType::SWire
            | ObjectType::SBox
            | ObjectType::Via
            | ObjectType::Row
            | ObjectType::TrackGrid
            | ObjectType::Region
            | ObjectType::Group
            | ObjectType::Blockage
            | ObjectType::Obstruction
            | ObjectType::Fill
            | ObjectType::PropertyDefinition => None,
        }
    }

    fn properties(&self) -> &Table<Property> {
        &self.props
    }

    fn properties_mut(&mut self) -> &mut Table<Property> {
        &mut self.props
    }
}

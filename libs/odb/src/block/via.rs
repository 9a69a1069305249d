//! Vias defined by a design.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::hash::hash_index;
use crate::id::Id;
use crate::object::impl_object;
use crate::stream::{IStream, OStream, Persist, SchemaRev};
use crate::tech::{via_layer_range, Tech, TechLayer, TechVia, ViaGenerateRule};
use crate::via::{ViaBox, ViaParams};

use super::Block;

#[derive(Debug, Clone, PartialEq)]
pub struct Via {
    pub name: String,
    pub boxes: Vec<ViaBox>,
    /// The parameters this via was generated from, if it came from a via rule.
    pub params: Option<ViaParams>,
    pub generate_rule: Option<Id<ViaGenerateRule>>,
    pub pattern: Option<String>,
    name_next: Option<Id<Via>>,
}

impl Via {
    /// The lowest and highest layers holding a shape of this via.
    pub fn layer_range(&self, tech: &Tech) -> Option<(Id<TechLayer>, Id<TechLayer>)> {
        via_layer_range(tech, self.boxes.iter().map(|b| b.layer))
    }
}

impl Persist for Via {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.name.write(s)?;
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
        let boxes = Vec::read(s)?;
        let params = if s.is_schema(SchemaRev::ViaParams) {
            Option::read(s)?
        } else {
            None
        };
        Ok(Self {
            name,
            boxes,
            params,
            generate_rule: Option::read(s)?,
            pattern: Option::read(s)?,
            name_next: Option::read(s)?,
        })
    }
}

impl_object!(Via);

hash_index!(ViaNames, Via, str, name, name_next);

/// A via of the technology or of a block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ViaRef {
    Tech(Id<TechVia>),
    Block(Id<Via>),
}

impl ViaRef {
    pub fn boxes<'a>(&self, tech: &'a Tech, block: &'a Block) -> &'a [ViaBox] {
        match self {
            Self::Tech(id) => &tech.via(*id).boxes,
            Self::Block(id) => &block.via(*id).boxes,
        }
    }

    /// The lowest and highest layers holding a shape of this via.
    pub fn layer_range(
        &self,
        tech: &Tech,
        block: &Block,
    ) -> Option<(Id<TechLayer>, Id<TechLayer>)> {
        via_layer_range(tech, self.boxes(tech, block).iter().map(|b| b.layer))
    }
}

impl Persist for ViaRef {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        match self {
            Self::Tech(id) => {
                0u8.write(s)?;
                id.write(s)
            }
            Self::Block(id) => {
                1u8.write(s)?;
                id.write(s)
            }
        }
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        match u8::read(s)? {
            0 => Ok(Self::Tech(Id::read(s)?)),
            1 => Ok(Self::Block(Id::read(s)?)),
            tag => Err(Error::Format(format!("invalid via scope {tag}"))),
        }
    }
}

impl Block {
    /// Creates a via. Returns `None` if the name is taken.
    pub fn create_via(&mut self, name: &str, boxes: Vec<ViaBox>) -> Option<Id<Via>> {
        if self.find_via(name).is_some() {
            return None;
        }
        let id = self.vias.create(Via {
            name: name.to_string(),
            boxes,
            params: None,
            generate_rule: None,
            pattern: None,
            name_next: None,
        });
        self.via_names.insert(&mut self.vias, id);
        Some(id)
    }

    /// Creates a via from via rule parameters, generating its shapes.
    pub fn create_rule_via(
        &mut self,
        name: &str,
        rule: Option<Id<ViaGenerateRule>>,
        params: ViaParams,
    ) -> Option<Id<Via>> {
        let id = self.create_via(name, params.boxes())?;
        let via = self.vias.get_mut(id);
        via.params = Some(params);
        via.generate_rule = rule;
        Some(id)
    }

    pub fn find_via(&self, name: &str) -> Option<Id<Via>> {
        self.via_names.find(&self.vias, name)
    }

    pub fn via(&self, id: Id<Via>) -> &Via {
        self.vias.get(id)
    }

    pub fn via_mut(&mut self, id: Id<Via>) -> &mut Via {
        self.vias.get_mut(id)
    }

    pub fn vias(&self) -> impl Iterator<Item = (Id<Via>, &Via)> + '_ {
        self.vias.iter()
    }
}

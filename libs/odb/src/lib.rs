//! A physical design database.
//!
//! Every object lives in a [`Table`](table::Table) owned by its scope: the
//! [`Database`] holds technologies, libraries, chips and blocks; a
//! [`Tech`] holds layers, vias and rules; a [`Lib`] holds sites and masters;
//! a [`Block`] holds the netlist, placement and routing of one design.
//! Objects are named by typed [`Id`]s that stay valid until the object is
//! destroyed, and the whole tree can be written to and read from a
//! schema-versioned binary stream.
//!
//! # Examples
//!
//! ```
//! # use odb::prelude::*;
//! let mut db = Database::new();
//! let tech = db.create_tech("tech", 1000).unwrap();
//! let chip = db.create_chip("chip").unwrap();
//! let block = db.create_block(chip, None, "top", tech).unwrap();
//! let net = db.block_mut(block).create_net("clk").unwrap();
//! assert_eq!(db.block(block).find_net("clk"), Some(net));
//! ```

use std::io::{Read, Write};

pub mod attr;
pub mod block;
pub mod error;
pub mod hash;
pub mod id;
pub mod library;
pub mod list;
pub mod object;
pub mod paged;
pub mod prelude;
pub mod prop;
pub mod rule;
pub mod stream;
pub mod table;
pub mod tech;
pub mod via;

#[cfg(test)]
mod tests;

use crate::block::{Inst, MasterRef};
use crate::object::{impl_object, ObjectTable, ObjectType};
use crate::prop::Property;
use crate::stream::{persist_fields, IStream, OStream, Persist, Schema};
use crate::table::Table;

pub use crate::block::Block;
pub use crate::error::{Error, Result};
pub use crate::id::Id;
pub use crate::library::Lib;
pub use crate::prop::{PropValue, PropertyScope};
pub use crate::tech::Tech;

/// A chip and its top-level block.
#[derive(Debug, Clone, PartialEq)]
pub struct Chip {
    pub name: String,
    top: Option<Id<Block>>,
}

impl Chip {
    pub fn top(&self) -> Option<Id<Block>> {
        self.top
    }
}

persist_fields!(Chip { name, top });

impl_object!(Tech, Lib, Chip, Block);

/// The scope owning a table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Scope {
    Database,
    Tech(Id<Tech>),
    Lib(Id<Lib>),
    Block(Id<Block>),
}

/// The root of the object tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    techs: Table<Tech>,
    libs: Table<Lib>,
    chips: Table<Chip>,
    blocks: Table<Block>,
    props: Table<Property>,
}

/// Mutable access to a block alongside read access to the technology and
/// libraries it refers to.
pub struct BlockEditor<'a> {
    pub id: Id<Block>,
    pub block: &'a mut Block,
    pub tech: &'a Tech,
    libs: &'a Table<Lib>,
}

impl BlockEditor<'_> {
    pub fn lib(&self, id: Id<Lib>) -> &Lib {
        self.libs.get(id)
    }

    /// Finds a master by name, searching libraries in creation order.
    pub fn find_master(&self, name: &str) -> Option<MasterRef> {
        find_master(self.libs, name)
    }

    /// Creates an instance of `master` with one terminal per master terminal.
    pub fn create_inst(&mut self, name: &str, master: MasterRef) -> Option<Id<Inst>> {
        let lib = self.libs.get(master.lib);
        let mterms: Vec<_> = lib.mterms(master.master).map(|(id, _)| id).collect();
        self.block.create_inst(name, master, mterms)
    }
}

fn find_master(libs: &Table<Lib>, name: &str) -> Option<MasterRef> {
    libs.iter().find_map(|(lib, l)| {
        Some(MasterRef {
            lib,
            master: l.find_master(name)?,
        })
    })
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a technology. Returns `None` if the name is taken.
    pub fn create_tech(&mut self, name: &str, dbu_per_micron: u32) -> Option<Id<Tech>> {
        if self.find_tech(name).is_some() {
            return None;
        }
        Some(self.techs.create(Tech::new(name, dbu_per_micron)))
    }

    pub fn find_tech(&self, name: &str) -> Option<Id<Tech>> {
        self.techs
            .iter()
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| id)
    }

    pub fn tech(&self, id: Id<Tech>) -> &Tech {
        self.techs.get(id)
    }

    pub fn tech_mut(&mut self, id: Id<Tech>) -> &mut Tech {
        self.techs.get_mut(id)
    }

    pub fn techs(&self) -> impl Iterator<Item = (Id<Tech>, &Tech)> + '_ {
        self.techs.iter()
    }

    /// Creates a library. Returns `None` if the name is taken.
    pub fn create_lib(&mut self, name: &str, tech: Id<Tech>) -> Option<Id<Lib>> {
        if self.find_lib(name).is_some() {
            return None;
        }
        Some(self.libs.create(Lib::new(name, tech)))
    }

    pub fn find_lib(&self, name: &str) -> Option<Id<Lib>> {
        self.libs
            .iter()
            .find(|(_, l)| l.name == name)
            .map(|(id, _)| id)
    }

    pub fn lib(&self, id: Id<Lib>) -> &Lib {
        self.libs.get(id)
    }

    pub fn lib_mut(&mut self, id: Id<Lib>) -> &mut Lib {
        self.libs.get_mut(id)
    }

    pub fn libs(&self) -> impl Iterator<Item = (Id<Lib>, &Lib)> + '_ {
        self.libs.iter()
    }

    /// Finds a master by name, searching libraries in creation order.
    pub fn find_master(&self, name: &str) -> Option<MasterRef> {
        find_master(&self.libs, name)
    }

    /// Creates a chip without a top block. Returns `None` if the name is taken.
    pub fn create_chip(&mut self, name: &str) -> Option<Id<Chip>> {
        if self.find_chip(name).is_some() {
            return None;
        }
        Some(self.chips.create(Chip {
            name: name.to_string(),
            top: None,
        }))
    }

    pub fn find_chip(&self, name: &str) -> Option<Id<Chip>> {
        self.chips
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id)
    }

    pub fn chip(&self, id: Id<Chip>) -> &Chip {
        self.chips.get(id)
    }

    pub fn chips(&self) -> impl Iterator<Item = (Id<Chip>, &Chip)> + '_ {
        self.chips.iter()
    }

    /// Creates the top block of `chip` or, given a parent, a child block.
    ///
    /// Returns `None` if the chip already has a top block or the parent
    /// already has a child with this name.
    pub fn create_block(
        &mut self,
        chip: Id<Chip>,
        parent: Option<Id<Block>>,
        name: &str,
        tech: Id<Tech>,
    ) -> Option<Id<Block>> {
        match parent {
            None if self.chips.get(chip).top.is_some() => return None,
            Some(p) if self.find_child(p, name).is_some() => return None,
            _ => {}
        }
        let dbu = self.techs.get(tech).dbu_per_micron;
        let id = self.blocks.create(Block::new(name, chip, parent, tech, dbu));
        match parent {
            None => self.chips.get_mut(chip).top = Some(id),
            Some(p) => self.blocks.get_mut(p).children.push(id),
        }
        Some(id)
    }

    pub fn find_child(&self, parent: Id<Block>, name: &str) -> Option<Id<Block>> {
        self.blocks
            .get(parent)
            .children
            .iter()
            .copied()
            .find(|&c| self.blocks.get(c).name == name)
    }

    pub fn block(&self, id: Id<Block>) -> &Block {
        self.blocks.get(id)
    }

    pub fn block_mut(&mut self, id: Id<Block>) -> &mut Block {
        self.blocks.get_mut(id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (Id<Block>, &Block)> + '_ {
        self.blocks.iter()
    }

    pub fn is_valid_block(&self, id: Id<Block>) -> bool {
        self.blocks.is_valid(id)
    }

    /// Borrows a block for editing together with its technology and the libraries.
    pub fn edit_block(&mut self, id: Id<Block>) -> BlockEditor<'_> {
        let block = self.blocks.get_mut(id);
        let tech = self.techs.get(block.tech);
        BlockEditor {
            id,
            block,
            tech,
            libs: &self.libs,
        }
    }

    /// Creates an instance of `master` in `block`.
    pub fn create_inst(
        &mut self,
        block: Id<Block>,
        name: &str,
        master: MasterRef,
    ) -> Option<Id<Inst>> {
        self.edit_block(block).create_inst(name, master)
    }

    /// Destroys a block and, recursively, its children.
    pub fn destroy_block(&mut self, id: Id<Block>) {
        for child in self.blocks.get(id).children.clone() {
            self.destroy_block(child);
        }
        let Block { parent, chip, .. } = *self.blocks.get(id);
        match parent {
            Some(p) => self.blocks.get_mut(p).children.retain(|&c| c != id),
            None => {
                let chip = self.chips.get_mut(chip);
                if chip.top == Some(id) {
                    chip.top = None;
                }
            }
        }
        self.destroy_properties(id.into());
        self.blocks.destroy(id);
    }

    /// Destroys a chip and its blocks.
    pub fn destroy_chip(&mut self, id: Id<Chip>) {
        if let Some(top) = self.chips.get(id).top {
            self.destroy_block(top);
        }
        self.destroy_properties(id.into());
        self.chips.destroy(id);
    }

    /// The objects and properties of one scope.
    pub fn scope(&self, scope: Scope) -> &dyn PropertyScope {
        match scope {
            Scope::Database => self,
            Scope::Tech(id) => self.techs.get(id),
            Scope::Lib(id) => self.libs.get(id),
            Scope::Block(id) => self.blocks.get(id),
        }
    }

    pub fn scope_mut(&mut self, scope: Scope) -> &mut dyn PropertyScope {
        match scope {
            Scope::Database => self,
            Scope::Tech(id) => self.techs.get_mut(id),
            Scope::Lib(id) => self.libs.get_mut(id),
            Scope::Block(id) => self.blocks.get_mut(id),
        }
    }

    /// The table holding objects of `kind` as seen from `scope`.
    ///
    /// Kinds that `scope` does not hold resolve against the database scope.
    pub fn resolve_table(&self, scope: Scope, kind: ObjectType) -> Option<&dyn ObjectTable> {
        self.scope(scope)
            .object_table(kind)
            .or_else(|| PropertyScope::object_table(self, kind))
    }

    /// Writes the database with the latest schema.
    pub fn write<W: Write>(&self, w: W) -> Result<W> {
        self.write_with_schema(w, Schema::default())
    }

    /// Writes the database, omitting fields newer than `schema`.
    pub fn write_with_schema<W: Write>(&self, w: W, schema: Schema) -> Result<W> {
        let mut s = OStream::new(w, schema)?;
        self.techs.write(&mut s)?;
        self.libs.write(&mut s)?;
        self.chips.write(&mut s)?;
        self.blocks.write(&mut s)?;
        self.props.write(&mut s)?;
        tracing::debug!(
            techs = self.techs.len(),
            libs = self.libs.len(),
            blocks = self.blocks.len(),
            "wrote database"
        );
        Ok(s.into_inner())
    }

    pub fn read<R: Read>(r: R) -> Result<Self> {
        let mut s = IStream::new(r)?;
        Ok(Self {
            techs: Table::read(&mut s)?,
            libs: Table::read(&mut s)?,
            chips: Table::read(&mut s)?,
            blocks: Table::read(&mut s)?,
            props: Table::read(&mut s)?,
        })
    }
}

impl PropertyScope for Database {
    fn object_table(&self, kind: ObjectType) -> Option<&dyn ObjectTable> {
        match kind {
            ObjectType::Tech => Some(&self.techs),
            ObjectType::Lib => Some(&self.libs),
            ObjectType::Chip => Some(&self.chips),
            ObjectType::Block => Some(&self.blocks),
            ObjectType::Property => Some(&self.props),
            ObjectType::TechLayer
            | ObjectType::TechVia
            | ObjectType::ViaGenerateRule
            | ObjectType::NonDefaultRule
            | ObjectType::LayerRule
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
            ObjectType::Tech => Some(&mut self.techs),
            ObjectType::Lib => Some(&mut self.libs),
            ObjectType::Chip => Some(&mut self.chips),
            ObjectType::Block => Some(&mut self.blocks),
            ObjectType::Property => Some(&mut self.props),
            ObjectType::TechLayer
            | ObjectType::TechVia
            | ObjectType::ViaGenerateRule
            | ObjectType::NonDefaultRule
            | ObjectType::LayerRule
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

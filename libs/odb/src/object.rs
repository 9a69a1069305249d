//! Object kinds and generic access to the table that holds each kind.

use std::fmt::Display;

use crate::id::Id;
use crate::prop::Property;
use crate::table::Table;

/// Every kind of object stored in a database table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ObjectType {
    // Database scope.
    Tech,
    Lib,
    Chip,
    Block,
    // Technology scope.
    TechLayer,
    TechVia,
    ViaGenerateRule,
    // Technology or block scope.
    NonDefaultRule,
    LayerRule,
    // Library scope.
    Site,
    Master,
    MTerm,
    // Block scope.
    Inst,
    ITerm,
    Net,
    BTerm,
    BPin,
    Wire,
    SWire,
    SBox,
    Via,
    Row,
    TrackGrid,
    Region,
    Group,
    Blockage,
    Obstruction,
    Fill,
    PropertyDefinition,
    // Every scope.
    Property,
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A type stored in a [`Table`].
pub trait Object {
    const KIND: ObjectType;
}

/// An untyped reference to an object within one scope.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ObjectRef {
    pub kind: ObjectType,
    pub oid: u32,
}

impl<T: Object> From<Id<T>> for ObjectRef {
    fn from(id: Id<T>) -> Self {
        Self {
            kind: T::KIND,
            oid: id.oid(),
        }
    }
}

/// Operations shared by every table, independent of its object type.
pub trait ObjectTable {
    fn object_type(&self) -> ObjectType;
    fn is_valid(&self, oid: u32) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn prop_head(&self, oid: u32) -> Option<Id<Property>>;
    fn set_prop_head(&mut self, oid: u32, head: Option<Id<Property>>);
}

impl<T: Object> ObjectTable for Table<T> {
    fn object_type(&self) -> ObjectType {
        T::KIND
    }

    fn is_valid(&self, oid: u32) -> bool {
        self.is_valid_oid(oid)
    }

    fn len(&self) -> usize {
        Table::len(self)
    }

    fn prop_head(&self, oid: u32) -> Option<Id<Property>> {
        Table::prop_head(self, oid)
    }

    fn set_prop_head(&mut self, oid: u32, head: Option<Id<Property>>) {
        Table::set_prop_head(self, oid, head)
    }
}

/// Implements [`Object`] for each listed type.
macro_rules! impl_object {
    ($($ty:ident),* $(,)?) => {
        $(impl $crate::object::Object for $ty {
            const KIND: $crate::object::ObjectType = $crate::object::ObjectType::$ty;
        })*
    };
}

pub(crate) use impl_object;

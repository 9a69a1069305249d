//! Named properties attached to objects.
//!
//! Properties live in the property table of the scope that owns the object.
//! The head of each object's property list is kept in a side table of the
//! object's own table, so objects without properties pay nothing for them.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::id::Id;
use crate::list::{intrusive_list, IntrusiveList};
use crate::object::{impl_object, ObjectRef, ObjectTable, ObjectType};
use crate::stream::{persist_fields, IStream, OStream, Persist};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    String(String),
    Int(i32),
    Double(f64),
    Bool(bool),
}

impl std::fmt::Display for PropValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropValue,
    pub(crate) next: Option<Id<Property>>,
}

impl_object!(Property);
persist_fields!(Property { name, value, next });

intrusive_list!(
    /// The properties of one object.
    PropertyList,
    Property,
    next
);

impl Persist for PropValue {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        match self {
            Self::String(v) => {
                0u8.write(s)?;
                v.write(s)
            }
            Self::Int(v) => {
                1u8.write(s)?;
                v.write(s)
            }
            Self::Double(v) => {
                2u8.write(s)?;
                v.write(s)
            }
            Self::Bool(v) => {
                3u8.write(s)?;
                v.write(s)
            }
        }
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok(match u8::read(s)? {
            0 => Self::String(String::read(s)?),
            1 => Self::Int(i32::read(s)?),
            2 => Self::Double(f64::read(s)?),
            3 => Self::Bool(bool::read(s)?),
            tag => return Err(Error::Format(format!("invalid property tag {tag}"))),
        })
    }
}

/// A scope that holds objects and their properties.
///
/// Methods taking an [`ObjectRef`] return `None` (or do nothing) when the
/// object does not live in this scope.
pub trait PropertyScope {
    /// The table holding objects of `kind`, if this scope has one.
    fn object_table(&self, kind: ObjectType) -> Option<&dyn ObjectTable>;
    fn object_table_mut(&mut self, kind: ObjectType) -> Option<&mut dyn ObjectTable>;
    fn properties(&self) -> &Table<Property>;
    fn properties_mut(&mut self) -> &mut Table<Property>;

    fn property_head(&self, obj: ObjectRef) -> Option<Id<Property>> {
        let table = self.object_table(obj.kind)?;
        if !table.is_valid(obj.oid) {
            return None;
        }
        table.prop_head(obj.oid)
    }

    /// Adds a property to `obj`. Returns `None` if `obj` is not a live object of
    /// this scope or already has a property with this name.
    fn create_property(
        &mut self,
        obj: ObjectRef,
        name: &str,
        value: PropValue,
    ) -> Option<Id<Property>> {
        let table = self.object_table(obj.kind)?;
        if !table.is_valid(obj.oid) || self.find_property(obj, name).is_some() {
            return None;
        }
        let mut head = self.property_head(obj);
        let id = self.properties_mut().create(Property {
            name: name.to_string(),
            value,
            next: None,
        });
        PropertyList::push_front(&mut head, self.properties_mut(), id);
        self.object_table_mut(obj.kind)?.set_prop_head(obj.oid, head);
        Some(id)
    }

    fn find_property(&self, obj: ObjectRef, name: &str) -> Option<Id<Property>> {
        PropertyList::iter(self.property_head(obj), self.properties())
            .find(|(_, p)| p.name == name)
            .map(|(id, _)| id)
    }

    fn property(&self, obj: ObjectRef, name: &str) -> Option<&PropValue> {
        let id = self.find_property(obj, name)?;
        Some(&self.properties().get(id).value)
    }

    /// The properties of `obj`, in list order.
    fn property_ids(&self, obj: ObjectRef) -> Vec<Id<Property>> {
        PropertyList::iter(self.property_head(obj), self.properties())
            .map(|(id, _)| id)
            .collect()
    }

    /// Restores creation order of `obj`'s properties after a bulk build.
    fn normalize_properties(&mut self, obj: ObjectRef) {
        let mut head = self.property_head(obj);
        if head.is_none() {
            return;
        }
        PropertyList::normalize(&mut head, self.properties_mut());
        if let Some(table) = self.object_table_mut(obj.kind) {
            table.set_prop_head(obj.oid, head);
        }
    }

    fn destroy_property(&mut self, obj: ObjectRef, id: Id<Property>) -> bool {
        let mut head = self.property_head(obj);
        if !PropertyList::unlink(&mut head, self.properties_mut(), id) {
            return false;
        }
        self.properties_mut().destroy(id);
        if let Some(table) = self.object_table_mut(obj.kind) {
            table.set_prop_head(obj.oid, head);
        }
        true
    }

    /// Destroys every property of `obj`.
    fn destroy_properties(&mut self, obj: ObjectRef) {
        for id in self.property_ids(obj) {
            self.properties_mut().destroy(id);
        }
        if let Some(table) = self.object_table_mut(obj.kind) {
            table.set_prop_head(obj.oid, None);
        }
    }
}

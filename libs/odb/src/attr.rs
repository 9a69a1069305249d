use std::io::{Read, Write};

use crate::error::Result;
use crate::paged::PagedVec;
use crate::stream::{IStream, OStream, Persist};

/// A sparse per-object attribute, keyed by OID.
///
/// Storage grows only when a value is first set for a high OID; unset
/// attributes read as `V::default()`.
#[derive(Clone, Debug, PartialEq)]
pub struct AttrTable<V> {
    values: PagedVec<V, 4>,
}

impl<V: Default + Clone> AttrTable<V> {
    pub fn new() -> Self {
        Self {
            values: PagedVec::new(),
        }
    }

    pub fn get(&self, oid: u32) -> V {
        self.values.get(oid as usize).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, oid: u32, value: V) {
        let idx = oid as usize;
        while self.values.len() <= idx {
            self.values.push_back(V::default());
        }
        self.values[idx] = value;
    }

    /// Resets the attribute of `oid` to its default.
    pub fn clear(&mut self, oid: u32) {
        if (oid as usize) < self.values.len() {
            self.values[oid as usize] = V::default();
        }
    }
}

impl<V: Default + Clone> Default for AttrTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Persist + Default> Persist for AttrTable<V> {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.values.write(s)
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok(Self {
            values: PagedVec::read(s)?,
        })
    }
}

//! Typed object tables.

use std::io::{Read, Write};

use crate::attr::AttrTable;
use crate::error::{Error, Result};
use crate::id::Id;
use crate::paged::PagedVec;
use crate::prop::Property;
use crate::stream::{IStream, OStream, Persist};

#[derive(Clone, Debug, PartialEq)]
enum Slot<T> {
    /// An unused slot; `next` is the following free OID, or 0.
    Free { next: u32 },
    Live(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Free { next: 0 }
    }
}

/// A collection of objects of one type, each identified by a stable [`Id`].
///
/// Destroyed slots are queued and reissued oldest first before the table
/// grows. Slot 0 is reserved so that no live object has OID 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Table<T> {
    slots: PagedVec<Slot<T>>,
    free_head: u32,
    free_tail: u32,
    live: u32,
    props: AttrTable<Option<Id<Property>>>,
}

impl<T> Table<T> {
    pub fn new() -> Self {
        let mut slots = PagedVec::new();
        slots.push_back(Slot::default());
        Self {
            slots,
            free_head: 0,
            free_tail: 0,
            live: 0,
            props: AttrTable::new(),
        }
    }

    /// Adds an object, returning its id.
    pub fn create(&mut self, item: T) -> Id<T> {
        let oid = if self.free_head != 0 {
            let oid = self.free_head;
            let Slot::Free { next } = self.slots[oid as usize] else {
                panic!("free list entry {oid} is live");
            };
            self.free_head = next;
            if next == 0 {
                self.free_tail = 0;
            }
            self.slots[oid as usize] = Slot::Live(item);
            oid
        } else {
            let oid = self.slots.len() as u32;
            self.slots.push_back(Slot::Live(item));
            oid
        };
        self.live += 1;
        Id::from_raw(oid).expect("slot 0 is reserved")
    }

    /// Removes an object and returns it.
    ///
    /// The caller must first unlink the object from any list or index that
    /// refers to it.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live object.
    pub fn destroy(&mut self, id: Id<T>) -> T {
        let oid = id.oid();
        let slot = std::mem::replace(&mut self.slots[id.index()], Slot::Free { next: 0 });
        let Slot::Live(item) = slot else {
            panic!("destroying {id:?}, which is not live");
        };
        if self.free_tail == 0 {
            self.free_head = oid;
        } else {
            self.slots[self.free_tail as usize] = Slot::Free { next: oid };
        }
        self.free_tail = oid;
        self.live -= 1;
        self.props.clear(oid);
        item
    }

    /// # Panics
    ///
    /// Panics if `id` does not refer to a live object.
    #[inline]
    pub fn get(&self, id: Id<T>) -> &T {
        match &self.slots[id.index()] {
            Slot::Live(item) => item,
            Slot::Free { .. } => panic!("{id:?} is not live"),
        }
    }

    /// # Panics
    ///
    /// Panics if `id` does not refer to a live object.
    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        match &mut self.slots[id.index()] {
            Slot::Live(item) => item,
            Slot::Free { .. } => panic!("{id:?} is not live"),
        }
    }

    pub fn try_get(&self, id: Id<T>) -> Option<&T> {
        match self.slots.get(id.index())? {
            Slot::Live(item) => Some(item),
            Slot::Free { .. } => None,
        }
    }

    #[inline]
    pub fn is_valid(&self, id: Id<T>) -> bool {
        self.try_get(id).is_some()
    }

    /// Whether the raw `oid` refers to a live object.
    pub fn is_valid_oid(&self, oid: u32) -> bool {
        Id::from_raw(oid).is_some_and(|id| self.is_valid(id))
    }

    /// The number of live objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.live as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over live objects in OID order.
    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(oid, slot)| match slot {
            Slot::Live(item) => Some((Id::from_raw(oid as u32)?, item)),
            Slot::Free { .. } => None,
        })
    }

    pub fn ids(&self) -> Vec<Id<T>> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// The head of the property list attached to `oid`.
    pub fn prop_head(&self, oid: u32) -> Option<Id<Property>> {
        self.props.get(oid)
    }

    pub fn set_prop_head(&mut self, oid: u32, head: Option<Id<Property>>) {
        self.props.set(oid, head);
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Persist> Persist for Slot<T> {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        match self {
            Slot::Free { next } => {
                0u8.write(s)?;
                next.write(s)
            }
            Slot::Live(item) => {
                1u8.write(s)?;
                item.write(s)
            }
        }
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        match u8::read(s)? {
            0 => Ok(Slot::Free { next: u32::read(s)? }),
            1 => Ok(Slot::Live(T::read(s)?)),
            tag => Err(Error::Format(format!("invalid slot tag {tag}"))),
        }
    }
}

impl<T: Persist> Persist for Table<T> {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.slots.write(s)?;
        self.free_head.write(s)?;
        self.free_tail.write(s)?;
        self.live.write(s)?;
        self.props.write(s)
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let table = Self {
            slots: PagedVec::read(s)?,
            free_head: u32::read(s)?,
            free_tail: u32::read(s)?,
            live: u32::read(s)?,
            props: AttrTable::read(s)?,
        };
        if table.slots.is_empty() || matches!(table.slots[0], Slot::Live(_)) {
            return Err(Error::Format("table slot 0 must be reserved".to_string()));
        }
        Ok(table)
    }
}

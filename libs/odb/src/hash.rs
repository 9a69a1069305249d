//! Open-chaining hash indexes over table objects.
//!
//! Chains are threaded through a `next_entry` field in each object, so an
//! index stores only its bucket heads. Resizing relinks chains but never
//! changes object ids.

use std::io::{Read, Write};
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::id::{raw, Id};
use crate::paged::PagedVec;
use crate::stream::{IStream, OStream, Persist};
use crate::table::Table;

/// The target average chain length.
pub const CHAIN_LENGTH: u32 = 4;

/// Hashes an integer key with a sequence of shifts, adds and xors.
pub fn hash_int(key: u32) -> u32 {
    let mut key = key;
    key = key.wrapping_add(!(key << 15));
    key ^= key >> 10;
    key = key.wrapping_add(key << 3);
    key ^= key >> 6;
    key = key.wrapping_add(!(key << 11));
    key ^= key >> 16;
    key
}

/// Hashes a name (sdbm).
pub fn hash_string(s: &str) -> u32 {
    s.bytes().fold(0u32, |h, c| {
        (c as u32)
            .wrapping_add(h << 6)
            .wrapping_add(h << 16)
            .wrapping_sub(h)
    })
}

pub trait HashKey: PartialEq {
    fn hash_key(&self) -> u32;
}

impl HashKey for str {
    #[inline]
    fn hash_key(&self) -> u32 {
        hash_string(self)
    }
}

impl HashKey for u32 {
    #[inline]
    fn hash_key(&self) -> u32 {
        hash_int(*self)
    }
}

/// Describes one hash index: the indexed type, its key and its chain link.
pub trait HashIndex {
    type Item;
    type Key: HashKey + ?Sized;

    fn key(item: &Self::Item) -> &Self::Key;
    fn next_entry(item: &Self::Item) -> Option<Id<Self::Item>>;
    fn set_next_entry(item: &mut Self::Item, next: Option<Id<Self::Item>>);
}

/// A hash index keyed by name ([`str`]) or by integer ([`u32`]).
///
/// The bucket count is always a power of two. It starts at zero, becomes one
/// on the first insert, doubles when the average chain length would exceed
/// [`CHAIN_LENGTH`] and halves when it falls below half of it.
pub struct HashTable<H: HashIndex> {
    buckets: PagedVec<u32>,
    num_entries: u32,
    _index: PhantomData<fn() -> H>,
}

impl<H: HashIndex> HashTable<H> {
    pub fn new() -> Self {
        Self {
            buckets: PagedVec::new(),
            num_entries: 0,
            _index: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.num_entries as usize
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_of(&self, key: &H::Key) -> usize {
        (key.hash_key() & (self.buckets.len() as u32 - 1)) as usize
    }

    pub fn insert(&mut self, table: &mut Table<H::Item>, id: Id<H::Item>) {
        self.num_entries += 1;
        if self.buckets.is_empty() {
            self.resize(table, 1);
        } else if self.num_entries / self.buckets.len() as u32 > CHAIN_LENGTH {
            self.grow_table(table);
        }
        let bucket = self.bucket_of(H::key(table.get(id)));
        let head = Id::from_raw(self.buckets[bucket]);
        H::set_next_entry(table.get_mut(id), head);
        self.buckets[bucket] = id.oid();
    }

    /// Removes `id` from the index. Chains are searched by identity, not key.
    pub fn remove(&mut self, table: &mut Table<H::Item>, id: Id<H::Item>) -> bool {
        if self.buckets.is_empty() {
            return false;
        }
        let bucket = self.bucket_of(H::key(table.get(id)));
        let next = H::next_entry(table.get(id));
        let mut prev: Option<Id<H::Item>> = None;
        let mut cur = Id::from_raw(self.buckets[bucket]);
        while let Some(c) = cur {
            if c == id {
                match prev {
                    Some(p) => H::set_next_entry(table.get_mut(p), next),
                    None => self.buckets[bucket] = raw(next),
                }
                H::set_next_entry(table.get_mut(id), None);
                self.num_entries -= 1;
                let n = self.num_entries;
                let buckets = self.buckets.len() as u32;
                if buckets > 1 && (n + n / 10) / buckets < CHAIN_LENGTH / 2 {
                    self.shrink_table(table);
                }
                return true;
            }
            prev = cur;
            cur = H::next_entry(table.get(c));
        }
        false
    }

    pub fn find(&self, table: &Table<H::Item>, key: &H::Key) -> Option<Id<H::Item>> {
        if self.buckets.is_empty() {
            return None;
        }
        let mut cur = Id::from_raw(self.buckets[self.bucket_of(key)]);
        while let Some(c) = cur {
            let item = table.get(c);
            if H::key(item) == key {
                return Some(c);
            }
            cur = H::next_entry(item);
        }
        None
    }

    pub fn has_member(&self, table: &Table<H::Item>, key: &H::Key) -> bool {
        self.find(table, key).is_some()
    }

    fn grow_table(&mut self, table: &mut Table<H::Item>) {
        let n = self.buckets.len() * 2;
        self.resize(table, n);
    }

    fn shrink_table(&mut self, table: &mut Table<H::Item>) {
        let n = self.buckets.len() / 2;
        self.resize(table, n);
    }

    /// Drains every chain and rebuckets all entries into `n` buckets.
    fn resize(&mut self, table: &mut Table<H::Item>, n: usize) {
        debug_assert!(n.is_power_of_two());
        let mut entries = Vec::new();
        for b in 0..self.buckets.len() {
            let mut cur = Id::from_raw(self.buckets[b]);
            while let Some(c) = cur {
                let item = table.get_mut(c);
                cur = H::next_entry(item);
                H::set_next_entry(item, None);
                entries.push(c);
            }
        }

        self.buckets.clear();
        for _ in 0..n {
            self.buckets.push_back(0);
        }
        for id in entries {
            let bucket = self.bucket_of(H::key(table.get(id)));
            let head = Id::from_raw(self.buckets[bucket]);
            H::set_next_entry(table.get_mut(id), head);
            self.buckets[bucket] = id.oid();
        }
    }
}

impl<H: HashIndex> Default for HashTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: HashIndex> Clone for HashTable<H> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            num_entries: self.num_entries,
            _index: PhantomData,
        }
    }
}

impl<H: HashIndex> std::fmt::Debug for HashTable<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashTable")
            .field("buckets", &self.buckets)
            .field("num_entries", &self.num_entries)
            .finish()
    }
}

impl<H: HashIndex> PartialEq for HashTable<H> {
    fn eq(&self, other: &Self) -> bool {
        self.num_entries == other.num_entries && self.buckets == other.buckets
    }
}

impl<H: HashIndex> Persist for HashTable<H> {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.buckets.write(s)?;
        self.num_entries.write(s)
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let buckets = PagedVec::<u32>::read(s)?;
        let num_entries = u32::read(s)?;
        if !buckets.is_empty() && !buckets.len().is_power_of_two() {
            return Err(Error::Format(format!(
                "hash table has {} buckets",
                buckets.len()
            )));
        }
        Ok(Self {
            buckets,
            num_entries,
            _index: PhantomData,
        })
    }
}

/// Declares a [`HashIndex`] marker over a key field and a chain field.
macro_rules! hash_index {
    ($(#[$meta:meta])* $name:ident, $item:ty, $key:ty, $key_field:ident, $next_field:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone)]
        pub struct $name;

        impl $crate::hash::HashIndex for $name {
            type Item = $item;
            type Key = $key;

            #[inline]
            fn key(item: &$item) -> &$key {
                &item.$key_field
            }

            #[inline]
            fn next_entry(item: &$item) -> Option<$crate::id::Id<$item>> {
                item.$next_field
            }

            #[inline]
            fn set_next_entry(item: &mut $item, next: Option<$crate::id::Id<$item>>) {
                item.$next_field = next;
            }
        }
    };
}

pub(crate) use hash_index;

//! Paged storage with stable element addresses.

use std::io::{Read, Write};
use std::ops::{Index, IndexMut};

use crate::error::Result;
use crate::stream::{IStream, OStream, Persist};

/// Marks an unused free-list link.
const NO_LINK: u32 = u32::MAX;

/// An element type that can hold a free-list link while its chunk is unused.
pub trait FreeLink {
    fn read_link(&self) -> u32;
    fn write_link(&mut self, next: u32);
}

macro_rules! free_link_int {
    ($($ty:ty),*) => {
        $(impl FreeLink for $ty {
            #[inline]
            fn read_link(&self) -> u32 {
                *self as u32
            }
            #[inline]
            fn write_link(&mut self, next: u32) {
                *self = next as $ty;
            }
        })*
    };
}

free_link_int!(u32, i32, u64, i64);

/// A growable array stored in fixed-size pages of `1 << PAGE_SHIFT` elements.
///
/// Pages are never moved or freed while the vector lives, so an element stays
/// at the same address for the vector's lifetime. Index decoding is a shift
/// and a mask.
pub struct PagedVec<T, const PAGE_SHIFT: u32 = 7> {
    pages: Vec<Box<[T]>>,
    /// Capacity of the page table, grown by half each time it fills.
    page_tbl_size: usize,
    len: u32,
    free_head: u32,
    chunk_size: u32,
}

impl<T, const PAGE_SHIFT: u32> PagedVec<T, PAGE_SHIFT> {
    pub const PAGE_SIZE: u32 = 1 << PAGE_SHIFT;
    const PAGE_MASK: u32 = Self::PAGE_SIZE - 1;

    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            page_tbl_size: 0,
            len: 0,
            free_head: NO_LINK,
            chunk_size: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of allocated pages.
    #[inline]
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    /// The capacity of the page table.
    #[inline]
    pub fn page_table_size(&self) -> usize {
        self.page_tbl_size
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        (idx < self.len()).then(|| &self[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).map(move |i| &self[i])
    }

    /// Removes every element and page.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.page_tbl_size = 0;
        self.len = 0;
        self.free_head = NO_LINK;
        self.chunk_size = 0;
    }

    fn grow_page_table(&mut self) {
        let cap = self.page_tbl_size;
        let new_cap = std::cmp::max(cap + cap / 2, cap + 1);
        self.pages.reserve_exact(new_cap - self.pages.len());
        self.page_tbl_size = new_cap;
    }
}

impl<T: Default, const PAGE_SHIFT: u32> PagedVec<T, PAGE_SHIFT> {
    /// Appends an element, allocating a page if the end is on a page boundary.
    pub fn push_back(&mut self, item: T) {
        let idx = self.len;
        assert!(idx != NO_LINK, "paged vector is full");
        let page = (idx >> PAGE_SHIFT) as usize;
        if page == self.pages.len() {
            if self.pages.len() == self.page_tbl_size {
                self.grow_page_table();
            }
            let page: Box<[T]> = (0..Self::PAGE_SIZE).map(|_| T::default()).collect();
            self.pages.push(page);
        }
        self.len += 1;
        self[idx as usize] = item;
    }
}

impl<T: Default + Clone + FreeLink, const PAGE_SHIFT: u32> PagedVec<T, PAGE_SHIFT> {
    /// Allocates `chunk_size` consecutive elements set to `init`, returning the
    /// index of the first.
    ///
    /// Freed chunks are reused, most recently freed first, before the vector
    /// grows. Every chunk of one vector must have the same size.
    pub fn get_idx(&mut self, chunk_size: u32, init: T) -> u32 {
        assert!(chunk_size > 0, "chunk size must be positive");
        if self.chunk_size == 0 {
            self.chunk_size = chunk_size;
        }
        assert_eq!(self.chunk_size, chunk_size, "chunk sizes must be uniform");

        if self.free_head == NO_LINK {
            let idx = self.len;
            for _ in 0..chunk_size {
                self.push_back(init.clone());
            }
            idx
        } else {
            let idx = self.free_head;
            self.free_head = self[idx as usize].read_link();
            for i in idx..idx + chunk_size {
                self[i as usize] = init.clone();
            }
            idx
        }
    }

    /// Returns a chunk allocated by [`PagedVec::get_idx`] to the free list.
    ///
    /// The chunk's first element holds the free-list link until reuse.
    pub fn free_idx(&mut self, idx: u32) {
        assert!(
            idx < self.len && self.chunk_size > 0,
            "freeing chunk {idx} that was never allocated"
        );
        let head = self.free_head;
        self[idx as usize].write_link(head);
        self.free_head = idx;
    }
}

impl<T, const PAGE_SHIFT: u32> Index<usize> for PagedVec<T, PAGE_SHIFT> {
    type Output = T;

    #[inline]
    fn index(&self, idx: usize) -> &T {
        assert!(idx < self.len(), "index {idx} out of range");
        let idx = idx as u32;
        &self.pages[(idx >> PAGE_SHIFT) as usize][(idx & Self::PAGE_MASK) as usize]
    }
}

impl<T, const PAGE_SHIFT: u32> IndexMut<usize> for PagedVec<T, PAGE_SHIFT> {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut T {
        assert!(idx < self.len(), "index {idx} out of range");
        let idx = idx as u32;
        &mut self.pages[(idx >> PAGE_SHIFT) as usize][(idx & Self::PAGE_MASK) as usize]
    }
}

impl<T, const PAGE_SHIFT: u32> Default for PagedVec<T, PAGE_SHIFT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, const PAGE_SHIFT: u32> Clone for PagedVec<T, PAGE_SHIFT> {
    fn clone(&self) -> Self {
        Self {
            pages: self.pages.clone(),
            page_tbl_size: self.page_tbl_size,
            len: self.len,
            free_head: self.free_head,
            chunk_size: self.chunk_size,
        }
    }
}

impl<T: std::fmt::Debug, const PAGE_SHIFT: u32> std::fmt::Debug for PagedVec<T, PAGE_SHIFT> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Element-wise equality.
impl<T: PartialEq, const PAGE_SHIFT: u32> PartialEq for PagedVec<T, PAGE_SHIFT> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T: Eq, const PAGE_SHIFT: u32> Eq for PagedVec<T, PAGE_SHIFT> {}

/// Stored as a length-prefixed sequence. Reading rebuilds the vector from scratch.
impl<T: Persist + Default, const PAGE_SHIFT: u32> Persist for PagedVec<T, PAGE_SHIFT> {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        s.write_len(self.len())?;
        for item in self.iter() {
            item.write(s)?;
        }
        Ok(())
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let len = s.read_len()?;
        let mut v = Self::new();
        for _ in 0..len {
            v.push_back(T::read(s)?);
        }
        Ok(v)
    }
}

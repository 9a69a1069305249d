//! Singly-linked lists threaded through objects of one table.
//!
//! A list is a head id stored in its owner plus a `next` id stored in each
//! member. Each list kind is a marker type implementing [`IntrusiveList`].

use std::marker::PhantomData;

use crate::id::Id;
use crate::table::Table;

pub trait IntrusiveList: Sized {
    type Item;

    /// Whether the order of this list carries meaning.
    const REVERSIBLE: bool = true;
    /// Whether members are prepended on creation, so that the list must be
    /// reversed once after a bulk build to read in creation order.
    const ORDER_REVERSED: bool = true;

    fn next(item: &Self::Item) -> Option<Id<Self::Item>>;
    fn set_next(item: &mut Self::Item, next: Option<Id<Self::Item>>);

    /// Links `id` in at the front of the list.
    fn push_front(
        head: &mut Option<Id<Self::Item>>,
        table: &mut Table<Self::Item>,
        id: Id<Self::Item>,
    ) {
        Self::set_next(table.get_mut(id), *head);
        *head = Some(id);
    }

    /// Links `id` in at the end of the list. Walks the whole list.
    fn push_back(
        head: &mut Option<Id<Self::Item>>,
        table: &mut Table<Self::Item>,
        id: Id<Self::Item>,
    ) {
        Self::set_next(table.get_mut(id), None);
        let Some(mut tail) = *head else {
            *head = Some(id);
            return;
        };
        while let Some(next) = Self::next(table.get(tail)) {
            tail = next;
        }
        Self::set_next(table.get_mut(tail), Some(id));
    }

    /// Unlinks `id`, returning whether it was a member.
    fn unlink(
        head: &mut Option<Id<Self::Item>>,
        table: &mut Table<Self::Item>,
        id: Id<Self::Item>,
    ) -> bool {
        let next = Self::next(table.get(id));
        if *head == Some(id) {
            *head = next;
            Self::set_next(table.get_mut(id), None);
            return true;
        }
        let mut cur = *head;
        while let Some(c) = cur {
            let after = Self::next(table.get(c));
            if after == Some(id) {
                Self::set_next(table.get_mut(c), next);
                Self::set_next(table.get_mut(id), None);
                return true;
            }
            cur = after;
        }
        false
    }

    fn iter(head: Option<Id<Self::Item>>, table: &Table<Self::Item>) -> ListIter<'_, Self> {
        ListIter {
            cur: head,
            table,
            _list: PhantomData,
        }
    }

    /// The number of members. Walks the whole list.
    fn size(head: Option<Id<Self::Item>>, table: &Table<Self::Item>) -> usize {
        Self::iter(head, table).count()
    }

    /// Reverses the list in place by relinking each member to its predecessor.
    fn reverse(head: &mut Option<Id<Self::Item>>, table: &mut Table<Self::Item>) {
        let mut prev = None;
        let mut cur = *head;
        while let Some(c) = cur {
            let item = table.get_mut(c);
            cur = Self::next(item);
            Self::set_next(item, prev);
            prev = Some(c);
        }
        *head = prev;
    }

    /// Restores creation order after a bulk build.
    ///
    /// Must be called exactly once per build phase.
    fn normalize(head: &mut Option<Id<Self::Item>>, table: &mut Table<Self::Item>) {
        if Self::REVERSIBLE && Self::ORDER_REVERSED {
            Self::reverse(head, table);
        }
    }
}

/// Iterates over the members of an intrusive list from head to tail.
pub struct ListIter<'a, L: IntrusiveList> {
    cur: Option<Id<L::Item>>,
    table: &'a Table<L::Item>,
    _list: PhantomData<L>,
}

impl<'a, L: IntrusiveList> Iterator for ListIter<'a, L> {
    type Item = (Id<L::Item>, &'a L::Item);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let item = self.table.get(id);
        self.cur = L::next(item);
        Some((id, item))
    }
}

/// Declares an [`IntrusiveList`] marker threaded through the given field.
macro_rules! intrusive_list {
    ($(#[$meta:meta])* $name:ident, $item:ty, $field:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone)]
        pub struct $name;

        impl $crate::list::IntrusiveList for $name {
            type Item = $item;

            #[inline]
            fn next(item: &$item) -> Option<$crate::id::Id<$item>> {
                item.$field
            }

            #[inline]
            fn set_next(item: &mut $item, next: Option<$crate::id::Id<$item>>) {
                item.$field = next;
            }
        }
    };
}

pub(crate) use intrusive_list;

use std::fmt::{Debug, Formatter};
use std::hash::Hash;
use std::marker::PhantomData;
use std::num::NonZeroU32;

/// The identity of a live object within one [`Table`](crate::table::Table).
///
/// Ids are 1-based; `Option<Id<T>>` is the null-able form and has the same size
/// as `Id<T>`.
pub struct Id<T>(NonZeroU32, PhantomData<fn() -> T>);

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = std::any::type_name::<T>();
        let name = name.rsplit("::").next().unwrap_or(name);
        write!(f, "{}({})", name, self.0)
    }
}

impl<T> Id<T> {
    /// Converts a raw OID to an id. OID 0 is null.
    #[inline]
    pub fn from_raw(oid: u32) -> Option<Self> {
        NonZeroU32::new(oid).map(|oid| Self(oid, PhantomData))
    }

    /// The raw OID.
    #[inline]
    pub fn oid(self) -> u32 {
        self.0.get()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0.get() as usize
    }
}

/// The raw OID of an optional id; 0 for `None`.
#[inline]
pub fn raw<T>(id: Option<Id<T>>) -> u32 {
    id.map(Id::oid).unwrap_or(0)
}

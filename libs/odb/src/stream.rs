//! The schema-versioned binary database stream.
//!
//! All values are little endian. Containers are length prefixed with a `u32`.
//! Fields added after the first schema revision are written and read only when
//! the stream's schema includes them; older streams read such fields as their
//! defaults.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use geometry::prelude::*;

use crate::error::{Error, Result};
use crate::id::Id;

/// Magic bytes at the start of every database stream.
pub const MAGIC: [u8; 4] = *b"ODB\0";

/// The schema major version. Streams with a different major version are rejected.
pub const SCHEMA_MAJOR: u16 = 1;

/// Schema revisions within the current major version.
///
/// Each revision gates the fields that were introduced with it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u16)]
pub enum SchemaRev {
    Initial = 0,
    /// Blocks carry a gcell grid.
    BlockGCellGrid = 1,
    /// Nets carry a non-default rule.
    NetNonDefaultRule = 2,
    /// Special wire boxes carry a mask color.
    SBoxMask = 3,
    /// Vias carry generation parameters.
    ViaParams = 4,
    /// Regions carry a type.
    RegionType = 5,
}

impl SchemaRev {
    /// The newest revision, written by default.
    pub const LATEST: Self = Self::RegionType;
}

/// A stream schema version.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Schema {
    pub major: u16,
    pub minor: u16,
}

impl Schema {
    pub const fn new(rev: SchemaRev) -> Self {
        Self {
            major: SCHEMA_MAJOR,
            minor: rev as u16,
        }
    }

    /// Whether fields introduced in `rev` are present.
    #[inline]
    pub fn is_schema(&self, rev: SchemaRev) -> bool {
        self.minor >= rev as u16
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(SchemaRev::LATEST)
    }
}

/// A database output stream.
pub struct OStream<W> {
    w: W,
    schema: Schema,
}

/// A database input stream.
pub struct IStream<R> {
    r: R,
    schema: Schema,
}

impl<W: Write> OStream<W> {
    /// Writes the stream header and returns the stream.
    pub fn new(mut w: W, schema: Schema) -> Result<Self> {
        w.write_all(&MAGIC)?;
        w.write_u16::<LittleEndian>(schema.major)?;
        w.write_u16::<LittleEndian>(schema.minor)?;
        Ok(Self { w, schema })
    }

    #[inline]
    pub fn is_schema(&self, rev: SchemaRev) -> bool {
        self.schema.is_schema(rev)
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    pub(crate) fn writer(&mut self) -> &mut W {
        &mut self.w
    }

    pub fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| Error::Format(format!("length {len} overflows")))?;
        len.write(self)
    }
}

impl<R: Read> IStream<R> {
    /// Reads and validates the stream header.
    pub fn new(mut r: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::BadMagic);
        }
        let major = r.read_u16::<LittleEndian>()?;
        let minor = r.read_u16::<LittleEndian>()?;
        if major != SCHEMA_MAJOR || minor > SchemaRev::LATEST as u16 {
            return Err(Error::UnsupportedSchema { major, minor });
        }
        tracing::debug!(major, minor, "reading database stream");
        Ok(Self {
            r,
            schema: Schema { major, minor },
        })
    }

    #[inline]
    pub fn is_schema(&self, rev: SchemaRev) -> bool {
        self.schema.is_schema(rev)
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub(crate) fn reader(&mut self) -> &mut R {
        &mut self.r
    }

    pub fn read_len(&mut self) -> Result<usize> {
        Ok(u32::read(self)? as usize)
    }
}

/// A value with a fixed binary layout in the database stream.
///
/// Writers and readers must visit fields in exactly the same order.
pub trait Persist: Sized {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()>;
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self>;
}

macro_rules! persist_prim {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Persist for $ty {
            #[inline]
            fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
                Ok(s.writer().$write::<LittleEndian>(*self)?)
            }
            #[inline]
            fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
                Ok(s.reader().$read::<LittleEndian>()?)
            }
        }
    };
}

persist_prim!(u16, write_u16, read_u16);
persist_prim!(u32, write_u32, read_u32);
persist_prim!(i32, write_i32, read_i32);
persist_prim!(u64, write_u64, read_u64);
persist_prim!(i64, write_i64, read_i64);
persist_prim!(f64, write_f64, read_f64);

impl Persist for u8 {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        Ok(s.writer().write_u8(*self)?)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok(s.reader().read_u8()?)
    }
}

impl Persist for bool {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        u8::from(*self).write(s)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        match u8::read(s)? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(Error::Format(format!("invalid bool {b}"))),
        }
    }
}

impl Persist for String {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        s.write_len(self.len())?;
        Ok(s.writer().write_all(self.as_bytes())?)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let len = s.read_len()?;
        let mut buf = vec![0u8; len];
        s.reader().read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|err| Error::Format(err.to_string()))
    }
}

impl<T: Persist> Persist for Option<T> {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        match self {
            Some(v) => {
                true.write(s)?;
                v.write(s)
            }
            None => false.write(s),
        }
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok(if bool::read(s)? { Some(T::read(s)?) } else { None })
    }
}

impl<T: Persist> Persist for Vec<T> {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        s.write_len(self.len())?;
        for v in self {
            v.write(s)?;
        }
        Ok(())
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let len = s.read_len()?;
        (0..len).map(|_| T::read(s)).collect()
    }
}

impl<A: Persist, B: Persist> Persist for (A, B) {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.0.write(s)?;
        self.1.write(s)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok((A::read(s)?, B::read(s)?))
    }
}

impl<A: Persist, B: Persist, C: Persist> Persist for (A, B, C) {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.0.write(s)?;
        self.1.write(s)?;
        self.2.write(s)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok((A::read(s)?, B::read(s)?, C::read(s)?))
    }
}

/// Ids are stored as their raw OID; a null id is only valid inside an `Option`.
impl<T> Persist for Id<T> {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.oid().write(s)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Id::from_raw(u32::read(s)?).ok_or_else(|| Error::Format("null object id".to_string()))
    }
}

impl Persist for Point {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.x.write(s)?;
        self.y.write(s)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok(Point::new(i64::read(s)?, i64::read(s)?))
    }
}

impl Persist for Rect {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.lower_left().write(s)?;
        self.upper_right().write(s)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let p0 = Point::read(s)?;
        let p1 = Point::read(s)?;
        if p0.x > p1.x || p0.y > p1.y {
            return Err(Error::Format("inverted rectangle".to_string()));
        }
        Ok(Rect::from_corners(p0, p1))
    }
}

impl Persist for Polygon {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.points().to_vec().write(s)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok(Polygon::from_verts(Vec::read(s)?))
    }
}

impl Persist for Oct {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.center_high().write(s)?;
        self.center_low().write(s)?;
        self.half_width().write(s)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let high = Point::read(s)?;
        let low = Point::read(s)?;
        let half_width = i64::read(s)?;
        let d = high - low;
        if d.x == 0 || d.x.abs() != d.y.abs() {
            return Err(Error::Format("octagon is not 45 degrees".to_string()));
        }
        Ok(Oct::new(low, high, half_width * 2))
    }
}

impl<A: Persist, B: Persist, C: Persist, D: Persist> Persist for (A, B, C, D) {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.0.write(s)?;
        self.1.write(s)?;
        self.2.write(s)?;
        self.3.write(s)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok((A::read(s)?, B::read(s)?, C::read(s)?, D::read(s)?))
    }
}

impl Persist for NamedOrientation {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        let idx = NamedOrientation::ALL
            .iter()
            .position(|o| o == self)
            .unwrap_or_default() as u8;
        idx.write(s)
    }
    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let idx = u8::read(s)?;
        NamedOrientation::ALL
            .get(idx as usize)
            .copied()
            .ok_or_else(|| Error::Format(format!("invalid orientation {idx}")))
    }
}

/// Implements [`Persist`] for a struct by visiting the listed fields in order.
macro_rules! persist_fields {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::stream::Persist for $ty {
            fn write<W: std::io::Write>(
                &self,
                s: &mut $crate::stream::OStream<W>,
            ) -> $crate::error::Result<()> {
                $($crate::stream::Persist::write(&self.$field, s)?;)*
                Ok(())
            }
            fn read<R: std::io::Read>(
                s: &mut $crate::stream::IStream<R>,
            ) -> $crate::error::Result<Self> {
                Ok(Self {
                    $($field: $crate::stream::Persist::read(s)?,)*
                })
            }
        }
    };
}

/// Implements [`Persist`] for a fieldless enum as a `u8` tag.
macro_rules! persist_enum {
    ($ty:ident { $($variant:ident = $tag:literal),+ $(,)? }) => {
        impl $crate::stream::Persist for $ty {
            fn write<W: std::io::Write>(
                &self,
                s: &mut $crate::stream::OStream<W>,
            ) -> $crate::error::Result<()> {
                let tag: u8 = match self {
                    $(Self::$variant => $tag,)+
                };
                $crate::stream::Persist::write(&tag, s)
            }
            fn read<R: std::io::Read>(
                s: &mut $crate::stream::IStream<R>,
            ) -> $crate::error::Result<Self> {
                let tag: u8 = $crate::stream::Persist::read(s)?;
                match tag {
                    $($tag => Ok(Self::$variant),)+
                    _ => Err($crate::error::Error::Format(format!(
                        "invalid {} tag {}",
                        stringify!($ty),
                        tag
                    ))),
                }
            }
        }
    };
}

/// Implements [`Persist`] for a `bitflags` type as its `u32` bits.
///
/// Unknown bits written by a newer build are dropped on read.
macro_rules! persist_flags {
    ($ty:ident) => {
        impl $crate::stream::Persist for $ty {
            fn write<W: std::io::Write>(
                &self,
                s: &mut $crate::stream::OStream<W>,
            ) -> $crate::error::Result<()> {
                $crate::stream::Persist::write(&self.bits(), s)
            }
            fn read<R: std::io::Read>(
                s: &mut $crate::stream::IStream<R>,
            ) -> $crate::error::Result<Self> {
                let bits: u32 = $crate::stream::Persist::read(s)?;
                Ok(Self::from_bits_truncate(bits))
            }
        }
    };
}

pub(crate) use {persist_enum, persist_fields, persist_flags};

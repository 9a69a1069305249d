//! Routed wires of regular nets and special wiring of special nets.

use std::io::{Read, Write};

use geometry::prelude::*;

use crate::error::{Error, Result};
use crate::id::Id;
use crate::list::{intrusive_list, IntrusiveList};
use crate::object::impl_object;
use crate::prop::PropertyScope;
use crate::rule::LayerRule;
use crate::stream::{persist_enum, persist_fields, IStream, OStream, Persist, SchemaRev};
use crate::tech::TechLayer;

use super::net::{Net, NetSWires, RuleRef, WireType};
use super::via::ViaRef;
use super::Block;

/// The purpose of a special wire shape.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum WireShapeType {
    #[default]
    None,
    Ring,
    PadRing,
    BlockRing,
    Stripe,
    FollowPin,
    IoWire,
    CoreWire,
    BlockWire,
    BlockageWire,
    FillWire,
    FillWireOpc,
    DrcFill,
}

persist_enum!(WireShapeType {
    None = 0,
    Ring = 1,
    PadRing = 2,
    BlockRing = 3,
    Stripe = 4,
    FollowPin = 5,
    IoWire = 6,
    CoreWire = 7,
    BlockWire = 8,
    BlockageWire = 9,
    FillWire = 10,
    FillWireOpc = 11,
    DrcFill = 12,
});

/// One step of an encoded wire.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum WireOp {
    /// Starts a new path on `layer`. `rule` is the taper rule in effect.
    Path {
        layer: Id<TechLayer>,
        wire_type: WireType,
        rule: Option<RuleRef<LayerRule>>,
    },
    /// A path vertex, with an optional end extension.
    Point { pt: Point, ext: Option<i64> },
    /// A via at the previous point; the path continues on `layer`.
    Via { via: ViaRef, layer: Id<TechLayer> },
    /// A rectangle given relative to the previous point.
    Rect(Rect),
    /// The mask color of the following segments.
    Color(u32),
}

impl Persist for WireOp {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        match self {
            Self::Path {
                layer,
                wire_type,
                rule,
            } => {
                0u8.write(s)?;
                layer.write(s)?;
                wire_type.write(s)?;
                rule.write(s)
            }
            Self::Point { pt, ext } => {
                1u8.write(s)?;
                pt.write(s)?;
                ext.write(s)
            }
            Self::Via { via, layer } => {
                2u8.write(s)?;
                via.write(s)?;
                layer.write(s)
            }
            Self::Rect(rect) => {
                3u8.write(s)?;
                rect.write(s)
            }
            Self::Color(mask) => {
                4u8.write(s)?;
                mask.write(s)
            }
        }
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok(match u8::read(s)? {
            0 => Self::Path {
                layer: Id::read(s)?,
                wire_type: WireType::read(s)?,
                rule: Option::read(s)?,
            },
            1 => Self::Point {
                pt: Point::read(s)?,
                ext: Option::read(s)?,
            },
            2 => Self::Via {
                via: ViaRef::read(s)?,
                layer: Id::read(s)?,
            },
            3 => Self::Rect(Rect::read(s)?),
            4 => Self::Color(u32::read(s)?),
            tag => return Err(Error::Format(format!("invalid wire op {tag}"))),
        })
    }
}

/// The routing of a regular net.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub net: Id<Net>,
    ops: Vec<WireOp>,
}

impl Wire {
    pub fn ops(&self) -> &[WireOp] {
        &self.ops
    }

    /// The number of paths in this wire.
    pub fn num_paths(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, WireOp::Path { .. }))
            .count()
    }
}

persist_fields!(Wire { net, ops });

/// Accumulates the paths of one net before they are committed as a [`Wire`].
#[derive(Debug, Clone, Default)]
pub struct WireEncoder {
    ops: Vec<WireOp>,
    layer: Option<Id<TechLayer>>,
}

impl WireEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layer the current path is on.
    pub fn layer(&self) -> Option<Id<TechLayer>> {
        self.layer
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn new_path(
        &mut self,
        layer: Id<TechLayer>,
        wire_type: WireType,
        rule: Option<RuleRef<LayerRule>>,
    ) {
        self.layer = Some(layer);
        self.ops.push(WireOp::Path {
            layer,
            wire_type,
            rule,
        });
    }

    pub fn add_point(&mut self, pt: Point, ext: Option<i64>) {
        self.ops.push(WireOp::Point { pt, ext });
    }

    /// Adds a via at the previous point; the path continues on `exit_layer`.
    pub fn add_via(&mut self, via: ViaRef, exit_layer: Id<TechLayer>) {
        self.layer = Some(exit_layer);
        self.ops.push(WireOp::Via {
            via,
            layer: exit_layer,
        });
    }

    pub fn add_rect(&mut self, offset: Rect) {
        self.ops.push(WireOp::Rect(offset));
    }

    pub fn set_color(&mut self, mask: u32) {
        self.ops.push(WireOp::Color(mask));
    }

    /// Discards everything encoded so far.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.layer = None;
    }

    /// Replaces the wire of `net` with the encoded paths and resets the encoder.
    ///
    /// Returns `None`, leaving the net unrouted, if nothing was encoded.
    pub fn commit(&mut self, block: &mut Block, net: Id<Net>) -> Option<Id<Wire>> {
        self.layer = None;
        let ops = std::mem::take(&mut self.ops);
        block.destroy_wire(net);
        if ops.is_empty() {
            return None;
        }
        Some(block.create_wire(net, ops))
    }
}

/// The shape of a special wire box.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SBoxShape {
    Rect { layer: Id<TechLayer>, rect: Rect },
    /// A 45-degree segment.
    Oct { layer: Id<TechLayer>, oct: Oct },
    Via { via: ViaRef, origin: Point },
}

impl SBoxShape {
    pub fn layer(&self) -> Option<Id<TechLayer>> {
        match self {
            Self::Rect { layer, .. } | Self::Oct { layer, .. } => Some(*layer),
            Self::Via { .. } => None,
        }
    }
}

impl Persist for SBoxShape {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        match self {
            Self::Rect { layer, rect } => {
                0u8.write(s)?;
                layer.write(s)?;
                rect.write(s)
            }
            Self::Oct { layer, oct } => {
                1u8.write(s)?;
                layer.write(s)?;
                oct.write(s)
            }
            Self::Via { via, origin } => {
                2u8.write(s)?;
                via.write(s)?;
                origin.write(s)
            }
        }
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        Ok(match u8::read(s)? {
            0 => Self::Rect {
                layer: Id::read(s)?,
                rect: Rect::read(s)?,
            },
            1 => Self::Oct {
                layer: Id::read(s)?,
                oct: Oct::read(s)?,
            },
            2 => Self::Via {
                via: ViaRef::read(s)?,
                origin: Point::read(s)?,
            },
            tag => return Err(Error::Format(format!("invalid sbox shape {tag}"))),
        })
    }
}

/// The shape of one path segment of width `width` from `prev` to `cur`.
///
/// Extensions extend a segment past its end points; an end without an
/// extension stops at the point itself. Returns `None`, after logging a
/// warning, for a zero-length segment.
///
/// # Panics
///
/// Panics if the segment is neither orthogonal nor at 45 degrees.
pub fn create_box(
    layer: Id<TechLayer>,
    prev: Point,
    prev_ext: Option<i64>,
    cur: Point,
    cur_ext: Option<i64>,
    width: i64,
) -> Option<SBoxShape> {
    let dw = width / 2;
    if prev == cur {
        tracing::warn!(x = cur.x, y = cur.y, "zero length path segment");
        return None;
    }
    let (lo, lo_ext, hi, hi_ext) = if (cur.x, cur.y) > (prev.x, prev.y) {
        (prev, prev_ext, cur, cur_ext)
    } else {
        (cur, cur_ext, prev, prev_ext)
    };
    let rect = if prev.x == cur.x {
        Rect::from_sides(
            cur.x - dw,
            lo.y - lo_ext.unwrap_or(0),
            cur.x + dw,
            hi.y + hi_ext.unwrap_or(0),
        )
    } else if prev.y == cur.y {
        Rect::from_sides(
            lo.x - lo_ext.unwrap_or(0),
            cur.y - dw,
            hi.x + hi_ext.unwrap_or(0),
            cur.y + dw,
        )
    } else if (cur.x - prev.x).abs() == (cur.y - prev.y).abs() {
        return Some(SBoxShape::Oct {
            layer,
            oct: Oct::new(prev, cur, width),
        });
    } else {
        panic!("not orthogonal nor 45-degree: {prev:?} -> {cur:?}");
    };
    Some(SBoxShape::Rect { layer, rect })
}

/// A group of special wire boxes of one net.
#[derive(Debug, Clone, PartialEq)]
pub struct SWire {
    pub net: Id<Net>,
    pub wire_type: WireType,
    /// For shield wiring, the net being shielded.
    pub shield: Option<Id<Net>>,
    pub(crate) sboxes: Option<Id<SBox>>,
    pub(crate) next: Option<Id<SWire>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SBox {
    pub swire: Id<SWire>,
    pub shape: SBoxShape,
    pub wire_shape: WireShapeType,
    pub mask: u32,
    next: Option<Id<SBox>>,
}

persist_fields!(SWire {
    net,
    wire_type,
    shield,
    sboxes,
    next,
});

impl Persist for SBox {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.swire.write(s)?;
        self.shape.write(s)?;
        self.wire_shape.write(s)?;
        if s.is_schema(SchemaRev::SBoxMask) {
            self.mask.write(s)?;
        }
        self.next.write(s)
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let swire = Id::read(s)?;
        let shape = SBoxShape::read(s)?;
        let wire_shape = WireShapeType::read(s)?;
        let mask = if s.is_schema(SchemaRev::SBoxMask) {
            u32::read(s)?
        } else {
            0
        };
        Ok(Self {
            swire,
            shape,
            wire_shape,
            mask,
            next: Option::read(s)?,
        })
    }
}

impl_object!(Wire, SWire, SBox);

intrusive_list!(
    /// The boxes of a special wire.
    SWireSBoxes,
    SBox,
    next
);

impl Block {
    /// Sets the wire of `net`, destroying any previous wire.
    pub fn create_wire(&mut self, net: Id<Net>, ops: Vec<WireOp>) -> Id<Wire> {
        self.destroy_wire(net);
        let id = self.wires.create(Wire { net, ops });
        self.nets.get_mut(net).wire = Some(id);
        id
    }

    pub fn wire(&self, id: Id<Wire>) -> &Wire {
        self.wires.get(id)
    }

    pub fn destroy_wire(&mut self, net: Id<Net>) {
        if let Some(wire) = self.nets.get_mut(net).wire.take() {
            self.destroy_properties(wire.into());
            self.wires.destroy(wire);
        }
    }

    pub fn create_swire(
        &mut self,
        net: Id<Net>,
        wire_type: WireType,
        shield: Option<Id<Net>>,
    ) -> Id<SWire> {
        let id = self.swires.create(SWire {
            net,
            wire_type,
            shield,
            sboxes: None,
            next: None,
        });
        let n = self.nets.get_mut(net);
        NetSWires::push_front(&mut n.swires, &mut self.swires, id);
        id
    }

    pub fn swire(&self, id: Id<SWire>) -> &SWire {
        self.swires.get(id)
    }

    pub fn create_sbox(
        &mut self,
        swire: Id<SWire>,
        shape: SBoxShape,
        wire_shape: WireShapeType,
        mask: u32,
    ) -> Id<SBox> {
        let id = self.sboxes.create(SBox {
            swire,
            shape,
            wire_shape,
            mask,
            next: None,
        });
        let sw = self.swires.get_mut(swire);
        SWireSBoxes::push_front(&mut sw.sboxes, &mut self.sboxes, id);
        id
    }

    pub fn sbox(&self, id: Id<SBox>) -> &SBox {
        self.sboxes.get(id)
    }

    pub fn swire_sboxes(&self, swire: Id<SWire>) -> impl Iterator<Item = (Id<SBox>, &SBox)> + '_ {
        SWireSBoxes::iter(self.swires.get(swire).sboxes, &self.sboxes)
    }

    /// Restores creation order of the boxes of `swire`.
    pub fn normalize_swire(&mut self, swire: Id<SWire>) {
        let sw = self.swires.get_mut(swire);
        SWireSBoxes::normalize(&mut sw.sboxes, &mut self.sboxes);
    }

    /// Destroys every special wire of `net` and their boxes.
    pub fn destroy_swires(&mut self, net: Id<Net>) {
        let mut head = self.nets.get_mut(net).swires.take();
        while let Some(swire) = head {
            head = self.swires.get(swire).next;
            let mut sbox = self.swires.get(swire).sboxes;
            while let Some(b) = sbox {
                sbox = self.sboxes.get(b).next;
                self.destroy_properties(b.into());
                self.sboxes.destroy(b);
            }
            self.destroy_properties(swire.into());
            self.swires.destroy(swire);
        }
    }
}

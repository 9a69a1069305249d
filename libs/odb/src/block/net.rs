//! Nets, block terminals and their pins.

use std::io::{Read, Write};

use bitflags::bitflags;
use geometry::prelude::*;

use crate::error::{Error, Result};
use crate::hash::hash_index;
use crate::id::Id;
use crate::library::{IoType, SigType};
use crate::list::{intrusive_list, IntrusiveList};
use crate::object::impl_object;
use crate::prop::PropertyScope;
use crate::rule::NonDefaultRule;
use crate::stream::{
    persist_enum, persist_fields, persist_flags, IStream, OStream, Persist, SchemaRev,
};
use crate::tech::TechLayer;

use super::inst::{ITerm, PlacementStatus, Source};
use super::wire::{SWire, Wire};
use super::Block;

/// The routing status of a wire.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum WireType {
    #[default]
    None,
    Cover,
    Fixed,
    Routed,
    Shield,
    NoShield,
}

persist_enum!(WireType {
    None = 0,
    Cover = 1,
    Fixed = 2,
    Routed = 3,
    Shield = 4,
    NoShield = 5,
});

bitflags! {
    /// Boolean net attributes, stored as one `u32`.
    ///
    /// Bit positions are part of the stream format and must not change.
    #[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
    pub struct NetFlags: u32 {
        const SPECIAL = 1 << 0;
        const FIXED_BUMP = 1 << 1;
        const DONT_TOUCH = 1 << 2;
        const WILD_CONNECTED = 1 << 3;
        const HAS_VIRTUAL_PINS = 1 << 4;
    }
}

persist_flags!(NetFlags);

/// An object that may be defined by either the technology or a block.
pub enum RuleRef<T> {
    Tech(Id<T>),
    Block(Id<T>),
}

impl<T> Clone for RuleRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RuleRef<T> {}

impl<T> PartialEq for RuleRef<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Tech(a), Self::Tech(b)) | (Self::Block(a), Self::Block(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> Eq for RuleRef<T> {}

impl<T> std::fmt::Debug for RuleRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tech(id) => write!(f, "Tech({id:?})"),
            Self::Block(id) => write!(f, "Block({id:?})"),
        }
    }
}

impl<T> RuleRef<T> {
    pub fn id(&self) -> Id<T> {
        match self {
            Self::Tech(id) | Self::Block(id) => *id,
        }
    }
}

impl<T> Persist for RuleRef<T> {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        match self {
            Self::Tech(id) => {
                0u8.write(s)?;
                id.write(s)
            }
            Self::Block(id) => {
                1u8.write(s)?;
                id.write(s)
            }
        }
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        match u8::read(s)? {
            0 => Ok(Self::Tech(Id::read(s)?)),
            1 => Ok(Self::Block(Id::read(s)?)),
            tag => Err(Error::Format(format!("invalid rule scope {tag}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Net {
    pub name: String,
    pub sig_type: SigType,
    pub wire_type: WireType,
    pub flags: NetFlags,
    pub source: Source,
    pub weight: i32,
    pub xtalk: i32,
    /// The non-default rule routing this net.
    pub ndr: Option<RuleRef<NonDefaultRule>>,
    pub(crate) iterms: Option<Id<ITerm>>,
    pub(crate) bterms: Option<Id<BTerm>>,
    pub(crate) swires: Option<Id<SWire>>,
    pub(crate) wire: Option<Id<Wire>>,
    name_next: Option<Id<Net>>,
}

impl Net {
    pub fn is_special(&self) -> bool {
        self.flags.contains(NetFlags::SPECIAL)
    }

    pub fn wire(&self) -> Option<Id<Wire>> {
        self.wire
    }
}

impl Persist for Net {
    fn write<W: Write>(&self, s: &mut OStream<W>) -> Result<()> {
        self.name.write(s)?;
        self.sig_type.write(s)?;
        self.wire_type.write(s)?;
        self.flags.write(s)?;
        self.source.write(s)?;
        self.weight.write(s)?;
        self.xtalk.write(s)?;
        if s.is_schema(SchemaRev::NetNonDefaultRule) {
            self.ndr.write(s)?;
        }
        self.iterms.write(s)?;
        self.bterms.write(s)?;
        self.swires.write(s)?;
        self.wire.write(s)?;
        self.name_next.write(s)
    }

    fn read<R: Read>(s: &mut IStream<R>) -> Result<Self> {
        let name = String::read(s)?;
        let sig_type = SigType::read(s)?;
        let wire_type = WireType::read(s)?;
        let flags = NetFlags::read(s)?;
        let source = Source::read(s)?;
        let weight = i32::read(s)?;
        let xtalk = i32::read(s)?;
        let ndr = if s.is_schema(SchemaRev::NetNonDefaultRule) {
            Option::read(s)?
        } else {
            None
        };
        Ok(Self {
            name,
            sig_type,
            wire_type,
            flags,
            source,
            weight,
            xtalk,
            ndr,
            iterms: Option::read(s)?,
            bterms: Option::read(s)?,
            swires: Option::read(s)?,
            wire: Option::read(s)?,
            name_next: Option::read(s)?,
        })
    }
}

/// A terminal of the block itself.
#[derive(Debug, Clone, PartialEq)]
pub struct BTerm {
    pub name: String,
    pub io_type: IoType,
    pub sig_type: SigType,
    pub(crate) net: Option<Id<Net>>,
    pub(crate) net_next: Option<Id<BTerm>>,
    pub(crate) bpins: Option<Id<BPin>>,
    name_next: Option<Id<BTerm>>,
}

impl BTerm {
    pub fn net(&self) -> Option<Id<Net>> {
        self.net
    }
}

/// One shape of a block pin.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PinBox {
    pub layer: Id<TechLayer>,
    pub rect: Rect,
    pub mask: u32,
}

/// A physical pin of a block terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct BPin {
    pub bterm: Id<BTerm>,
    pub status: PlacementStatus,
    pub boxes: Vec<PinBox>,
    pub(crate) next: Option<Id<BPin>>,
}

persist_fields!(BTerm {
    name,
    io_type,
    sig_type,
    net,
    net_next,
    bpins,
    name_next,
});
persist_fields!(PinBox { layer, rect, mask });
persist_fields!(BPin {
    bterm,
    status,
    boxes,
    next,
});

impl_object!(Net, BTerm, BPin);

hash_index!(NetNames, Net, str, name, name_next);
hash_index!(BTermNames, BTerm, str, name, name_next);

intrusive_list!(
    /// The instance terminals connected to a net.
    NetITerms,
    ITerm,
    net_next
);
intrusive_list!(
    /// The block terminals connected to a net.
    NetBTerms,
    BTerm,
    net_next
);
intrusive_list!(
    /// The special wires of a net.
    NetSWires,
    SWire,
    next
);
intrusive_list!(
    /// The pins of a block terminal.
    BTermBPins,
    BPin,
    next
);

impl Block {
    /// Creates an unconnected net. Returns `None` if the name is taken.
    pub fn create_net(&mut self, name: &str) -> Option<Id<Net>> {
        if self.find_net(name).is_some() {
            return None;
        }
        let id = self.nets.create(Net {
            name: name.to_string(),
            sig_type: SigType::Signal,
            wire_type: WireType::None,
            flags: NetFlags::empty(),
            source: Source::None,
            weight: 1,
            xtalk: 0,
            ndr: None,
            iterms: None,
            bterms: None,
            swires: None,
            wire: None,
            name_next: None,
        });
        self.net_names.insert(&mut self.nets, id);
        Some(id)
    }

    pub fn find_net(&self, name: &str) -> Option<Id<Net>> {
        self.net_names.find(&self.nets, name)
    }

    pub fn net(&self, id: Id<Net>) -> &Net {
        self.nets.get(id)
    }

    pub fn net_mut(&mut self, id: Id<Net>) -> &mut Net {
        self.nets.get_mut(id)
    }

    pub fn nets(&self) -> impl Iterator<Item = (Id<Net>, &Net)> + '_ {
        self.nets.iter()
    }

    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }

    pub fn net_iterms(&self, net: Id<Net>) -> impl Iterator<Item = (Id<ITerm>, &ITerm)> + '_ {
        NetITerms::iter(self.nets.get(net).iterms, &self.iterms)
    }

    pub fn net_bterms(&self, net: Id<Net>) -> impl Iterator<Item = (Id<BTerm>, &BTerm)> + '_ {
        NetBTerms::iter(self.nets.get(net).bterms, &self.bterms)
    }

    pub fn net_swires(&self, net: Id<Net>) -> impl Iterator<Item = (Id<SWire>, &SWire)> + '_ {
        NetSWires::iter(self.nets.get(net).swires, &self.swires)
    }

    /// Restores creation order of the net's terminal lists and properties
    /// after a bulk build.
    pub fn normalize_net(&mut self, net: Id<Net>) {
        let n = self.nets.get_mut(net);
        NetITerms::normalize(&mut n.iterms, &mut self.iterms);
        NetBTerms::normalize(&mut n.bterms, &mut self.bterms);
        NetSWires::normalize(&mut n.swires, &mut self.swires);
        self.normalize_properties(net.into());
    }

    /// Destroys a net along with its wiring and properties.
    ///
    /// Connected terminals are disconnected, not destroyed.
    pub fn destroy_net(&mut self, id: Id<Net>) {
        let iterms: Vec<_> = self.net_iterms(id).map(|(it, _)| it).collect();
        for iterm in iterms {
            self.disconnect_iterm(iterm);
        }
        let bterms: Vec<_> = self.net_bterms(id).map(|(bt, _)| bt).collect();
        for bterm in bterms {
            self.disconnect_bterm(bterm);
        }
        self.destroy_wire(id);
        self.destroy_swires(id);
        self.destroy_properties(id.into());
        self.net_names.remove(&mut self.nets, id);
        self.nets.destroy(id);
    }

    /// Creates a terminal connected to `net`. Returns `None` if the name is taken.
    pub fn create_bterm(&mut self, net: Id<Net>, name: &str) -> Option<Id<BTerm>> {
        if self.find_bterm(name).is_some() {
            return None;
        }
        let id = self.bterms.create(BTerm {
            name: name.to_string(),
            io_type: IoType::InOut,
            sig_type: SigType::Signal,
            net: None,
            net_next: None,
            bpins: None,
            name_next: None,
        });
        self.bterm_names.insert(&mut self.bterms, id);
        self.connect_bterm(id, net);
        Some(id)
    }

    pub fn find_bterm(&self, name: &str) -> Option<Id<BTerm>> {
        self.bterm_names.find(&self.bterms, name)
    }

    pub fn bterm(&self, id: Id<BTerm>) -> &BTerm {
        self.bterms.get(id)
    }

    pub fn bterm_mut(&mut self, id: Id<BTerm>) -> &mut BTerm {
        self.bterms.get_mut(id)
    }

    pub fn bterms(&self) -> impl Iterator<Item = (Id<BTerm>, &BTerm)> + '_ {
        self.bterms.iter()
    }

    /// Connects `bterm` to `net`, first disconnecting it from any other net.
    pub fn connect_bterm(&mut self, bterm: Id<BTerm>, net: Id<Net>) {
        if self.bterms.get(bterm).net == Some(net) {
            return;
        }
        self.disconnect_bterm(bterm);
        let n = self.nets.get_mut(net);
        NetBTerms::push_front(&mut n.bterms, &mut self.bterms, bterm);
        self.bterms.get_mut(bterm).net = Some(net);
    }

    pub fn disconnect_bterm(&mut self, bterm: Id<BTerm>) {
        let Some(net) = self.bterms.get(bterm).net else {
            return;
        };
        let n = self.nets.get_mut(net);
        NetBTerms::unlink(&mut n.bterms, &mut self.bterms, bterm);
        self.bterms.get_mut(bterm).net = None;
    }

    /// Destroys a terminal and its pins.
    pub fn destroy_bterm(&mut self, id: Id<BTerm>) {
        self.disconnect_bterm(id);
        self.destroy_bpins(id);
        self.destroy_properties(id.into());
        self.bterm_names.remove(&mut self.bterms, id);
        self.bterms.destroy(id);
    }

    pub fn create_bpin(&mut self, bterm: Id<BTerm>) -> Id<BPin> {
        let id = self.bpins.create(BPin {
            bterm,
            status: PlacementStatus::None,
            boxes: Vec::new(),
            next: None,
        });
        let bt = self.bterms.get_mut(bterm);
        BTermBPins::push_front(&mut bt.bpins, &mut self.bpins, id);
        id
    }

    /// Destroys every pin of `bterm`.
    pub fn destroy_bpins(&mut self, bterm: Id<BTerm>) {
        let mut head = self.bterms.get_mut(bterm).bpins.take();
        while let Some(bpin) = head {
            head = self.bpins.get(bpin).next;
            self.destroy_properties(bpin.into());
            self.bpins.destroy(bpin);
        }
    }

    pub fn bpin(&self, id: Id<BPin>) -> &BPin {
        self.bpins.get(id)
    }

    pub fn bpin_mut(&mut self, id: Id<BPin>) -> &mut BPin {
        self.bpins.get_mut(id)
    }

    pub fn bterm_bpins(&self, bterm: Id<BTerm>) -> impl Iterator<Item = (Id<BPin>, &BPin)> + '_ {
        BTermBPins::iter(self.bterms.get(bterm).bpins, &self.bpins)
    }

    /// Restores creation order of the terminal's pins and properties.
    pub fn normalize_bterm(&mut self, bterm: Id<BTerm>) {
        let bt = self.bterms.get_mut(bterm);
        BTermBPins::normalize(&mut bt.bpins, &mut self.bpins);
        self.normalize_properties(bterm.into());
    }
}

//! Instances of library masters and their terminals.

use geometry::prelude::*;

use crate::hash::hash_index;
use crate::id::Id;
use crate::library::{Lib, MTerm, Master};
use crate::list::IntrusiveList;
use crate::object::impl_object;
use crate::prop::PropertyScope;
use crate::stream::{persist_enum, persist_fields};

use super::floorplan::{Group, Region};
use super::net::{Net, NetITerms};
use super::Block;

/// How firmly an object is placed.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum PlacementStatus {
    #[default]
    None,
    Unplaced,
    Suggested,
    Placed,
    Locked,
    Firm,
    Cover,
}

impl PlacementStatus {
    pub fn is_placed(&self) -> bool {
        !matches!(self, Self::None | Self::Unplaced)
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Locked | Self::Firm | Self::Cover)
    }
}

/// Where an object came from.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Source {
    #[default]
    None,
    Netlist,
    Dist,
    User,
    Timing,
    Test,
}

persist_enum!(PlacementStatus {
    None = 0,
    Unplaced = 1,
    Suggested = 2,
    Placed = 3,
    Locked = 4,
    Firm = 5,
    Cover = 6,
});
persist_enum!(Source {
    None = 0,
    Netlist = 1,
    Dist = 2,
    User = 3,
    Timing = 4,
    Test = 5,
});

/// A master in a specific library.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MasterRef {
    pub lib: Id<Lib>,
    pub master: Id<Master>,
}

persist_fields!(MasterRef { lib, master });

#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    pub name: String,
    pub master: MasterRef,
    pub origin: Point,
    pub orient: NamedOrientation,
    pub status: PlacementStatus,
    pub source: Source,
    pub weight: i32,
    pub region: Option<Id<Region>>,
    pub group: Option<Id<Group>>,
    /// Halo around the instance as left, bottom, right, top margins.
    pub halo: Option<(i64, i64, i64, i64)>,
    /// One terminal per master terminal, in master order.
    pub(crate) iterms: Vec<Id<ITerm>>,
    name_next: Option<Id<Inst>>,
}

/// A terminal of an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ITerm {
    pub inst: Id<Inst>,
    pub mterm: Id<MTerm>,
    pub(crate) net: Option<Id<Net>>,
    pub(crate) net_next: Option<Id<ITerm>>,
}

persist_fields!(Inst {
    name,
    master,
    origin,
    orient,
    status,
    source,
    weight,
    region,
    group,
    halo,
    iterms,
    name_next,
});
persist_fields!(ITerm {
    inst,
    mterm,
    net,
    net_next,
});

impl_object!(Inst, ITerm);

hash_index!(InstNames, Inst, str, name, name_next);

impl Inst {
    pub fn iterms(&self) -> &[Id<ITerm>] {
        &self.iterms
    }

    pub fn set_location(&mut self, origin: Point, orient: NamedOrientation) {
        self.origin = origin;
        self.orient = orient;
    }
}

impl ITerm {
    pub fn net(&self) -> Option<Id<Net>> {
        self.net
    }
}

impl Block {
    /// Creates an instance with one terminal per entry of `mterms`.
    /// Returns `None` if the name is taken.
    pub fn create_inst(
        &mut self,
        name: &str,
        master: MasterRef,
        mterms: impl IntoIterator<Item = Id<MTerm>>,
    ) -> Option<Id<Inst>> {
        if self.find_inst(name).is_some() {
            return None;
        }
        let id = self.insts.create(Inst {
            name: name.to_string(),
            master,
            origin: Point::zero(),
            orient: NamedOrientation::N,
            status: PlacementStatus::None,
            source: Source::None,
            weight: 0,
            region: None,
            group: None,
            halo: None,
            iterms: Vec::new(),
            name_next: None,
        });
        let iterms = mterms
            .into_iter()
            .map(|mterm| {
                self.iterms.create(ITerm {
                    inst: id,
                    mterm,
                    net: None,
                    net_next: None,
                })
            })
            .collect();
        self.insts.get_mut(id).iterms = iterms;
        self.inst_names.insert(&mut self.insts, id);
        Some(id)
    }

    pub fn find_inst(&self, name: &str) -> Option<Id<Inst>> {
        self.inst_names.find(&self.insts, name)
    }

    pub fn inst(&self, id: Id<Inst>) -> &Inst {
        self.insts.get(id)
    }

    pub fn inst_mut(&mut self, id: Id<Inst>) -> &mut Inst {
        self.insts.get_mut(id)
    }

    pub fn insts(&self) -> impl Iterator<Item = (Id<Inst>, &Inst)> + '_ {
        self.insts.iter()
    }

    pub fn num_insts(&self) -> usize {
        self.insts.len()
    }

    pub fn iterm(&self, id: Id<ITerm>) -> &ITerm {
        self.iterms.get(id)
    }

    /// The terminal of `inst` that instantiates `mterm`.
    pub fn find_iterm(&self, inst: Id<Inst>, mterm: Id<MTerm>) -> Option<Id<ITerm>> {
        self.insts
            .get(inst)
            .iterms
            .iter()
            .copied()
            .find(|&it| self.iterms.get(it).mterm == mterm)
    }

    /// Connects `iterm` to `net`, first disconnecting it from any other net.
    pub fn connect_iterm(&mut self, iterm: Id<ITerm>, net: Id<Net>) {
        if self.iterms.get(iterm).net == Some(net) {
            return;
        }
        self.disconnect_iterm(iterm);
        let n = self.nets.get_mut(net);
        NetITerms::push_front(&mut n.iterms, &mut self.iterms, iterm);
        self.iterms.get_mut(iterm).net = Some(net);
    }

    pub fn disconnect_iterm(&mut self, iterm: Id<ITerm>) {
        let Some(net) = self.iterms.get(iterm).net else {
            return;
        };
        let n = self.nets.get_mut(net);
        NetITerms::unlink(&mut n.iterms, &mut self.iterms, iterm);
        self.iterms.get_mut(iterm).net = None;
    }

    /// Destroys an instance, disconnecting and destroying its terminals.
    pub fn destroy_inst(&mut self, id: Id<Inst>) {
        for iterm in self.insts.get(id).iterms.clone() {
            self.disconnect_iterm(iterm);
            self.iterms.destroy(iterm);
        }
        if let Some(group) = self.insts.get(id).group {
            self.groups.get_mut(group).insts.retain(|&i| i != id);
        }
        self.destroy_properties(id.into());
        self.inst_names.remove(&mut self.insts, id);
        self.insts.destroy(id);
    }
}

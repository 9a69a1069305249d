//! Cell libraries: sites, masters and master terminals.

use geometry::prelude::*;

use crate::hash::{hash_index, HashTable};
use crate::id::Id;
use crate::list::IntrusiveList;
use crate::object::{impl_object, ObjectTable, ObjectType};
use crate::prop::{Property, PropertyScope};
use crate::stream::{persist_enum, persist_fields};
use crate::table::Table;
use crate::tech::Tech;

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum SiteClass {
    #[default]
    Core,
    Pad,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum MasterKind {
    #[default]
    Core,
    Block,
    Pad,
    Endcap,
    Cover,
    Ring,
}

/// The direction of a terminal.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum IoType {
    #[default]
    InOut,
    Input,
    Output,
    Feedthru,
}

/// The intended use of a net or terminal.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum SigType {
    #[default]
    Signal,
    Power,
    Ground,
    Clock,
    Analog,
    Reset,
    Scan,
    Tieoff,
}

persist_enum!(SiteClass { Core = 0, Pad = 1 });
persist_enum!(MasterKind {
    Core = 0,
    Block = 1,
    Pad = 2,
    Endcap = 3,
    Cover = 4,
    Ring = 5,
});
persist_enum!(IoType {
    InOut = 0,
    Input = 1,
    Output = 2,
    Feedthru = 3,
});
persist_enum!(SigType {
    Signal = 0,
    Power = 1,
    Ground = 2,
    Clock = 3,
    Analog = 4,
    Reset = 5,
    Scan = 6,
    Tieoff = 7,
});

impl SigType {
    pub fn is_supply(&self) -> bool {
        matches!(self, Self::Power | Self::Ground)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub name: String,
    pub width: i64,
    pub height: i64,
    pub class: SiteClass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Master {
    pub name: String,
    pub kind: MasterKind,
    pub width: i64,
    pub height: i64,
    pub origin: Point,
    pub site: Option<Id<Site>>,
    mterms: Option<Id<MTerm>>,
    num_mterms: u32,
    name_next: Option<Id<Master>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MTerm {
    pub name: String,
    pub master: Id<Master>,
    pub io_type: IoType,
    pub sig_type: SigType,
    /// The position of this terminal within its master.
    pub index: u32,
    next: Option<Id<MTerm>>,
}

persist_fields!(Site {
    name,
    width,
    height,
    class,
});
persist_fields!(Master {
    name,
    kind,
    width,
    height,
    origin,
    site,
    mterms,
    num_mterms,
    name_next,
});
persist_fields!(MTerm {
    name,
    master,
    io_type,
    sig_type,
    index,
    next,
});

impl_object!(Site, Master, MTerm);

hash_index!(MasterNames, Master, str, name, name_next);

/// The terminals of a master, in creation order.
#[derive(Debug, Copy, Clone)]
pub struct MasterMTerms;

impl IntrusiveList for MasterMTerms {
    type Item = MTerm;
    const ORDER_REVERSED: bool = false;

    fn next(item: &MTerm) -> Option<Id<MTerm>> {
        item.next
    }

    fn set_next(item: &mut MTerm, next: Option<Id<MTerm>>) {
        item.next = next;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lib {
    pub name: String,
    pub tech: Id<Tech>,
    sites: Table<Site>,
    masters: Table<Master>,
    master_names: HashTable<MasterNames>,
    mterms: Table<MTerm>,
    props: Table<Property>,
}

persist_fields!(Lib {
    name,
    tech,
    sites,
    masters,
    master_names,
    mterms,
    props,
});

impl Lib {
    pub fn new(name: impl Into<String>, tech: Id<Tech>) -> Self {
        Self {
            name: name.into(),
            tech,
            sites: Table::new(),
            masters: Table::new(),
            master_names: HashTable::new(),
            mterms: Table::new(),
            props: Table::new(),
        }
    }

    pub fn create_site(&mut self, name: &str, width: i64, height: i64) -> Option<Id<Site>> {
        if self.find_site(name).is_some() {
            return None;
        }
        Some(self.sites.create(Site {
            name: name.to_string(),
            width,
            height,
            class: SiteClass::Core,
        }))
    }

    pub fn find_site(&self, name: &str) -> Option<Id<Site>> {
        self.sites
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(id, _)| id)
    }

    pub fn site(&self, id: Id<Site>) -> &Site {
        self.sites.get(id)
    }

    pub fn create_master(&mut self, name: &str, width: i64, height: i64) -> Option<Id<Master>> {
        if self.find_master(name).is_some() {
            return None;
        }
        let id = self.masters.create(Master {
            name: name.to_string(),
            kind: MasterKind::Core,
            width,
            height,
            origin: Point::zero(),
            site: None,
            mterms: None,
            num_mterms: 0,
            name_next: None,
        });
        self.master_names.insert(&mut self.masters, id);
        Some(id)
    }

    pub fn find_master(&self, name: &str) -> Option<Id<Master>> {
        self.master_names.find(&self.masters, name)
    }

    pub fn master(&self, id: Id<Master>) -> &Master {
        self.masters.get(id)
    }

    pub fn master_mut(&mut self, id: Id<Master>) -> &mut Master {
        self.masters.get_mut(id)
    }

    pub fn masters(&self) -> impl Iterator<Item = (Id<Master>, &Master)> + '_ {
        self.masters.iter()
    }

    /// Adds a terminal after the master's existing terminals.
    /// Returns `None` if the name is taken.
    pub fn create_mterm(
        &mut self,
        master: Id<Master>,
        name: &str,
        io_type: IoType,
        sig_type: SigType,
    ) -> Option<Id<MTerm>> {
        if self.find_mterm(master, name).is_some() {
            return None;
        }
        let m = self.masters.get_mut(master);
        let index = m.num_mterms;
        m.num_mterms += 1;
        let id = self.mterms.create(MTerm {
            name: name.to_string(),
            master,
            io_type,
            sig_type,
            index,
            next: None,
        });
        let m = self.masters.get_mut(master);
        MasterMTerms::push_back(&mut m.mterms, &mut self.mterms, id);
        Some(id)
    }

    pub fn find_mterm(&self, master: Id<Master>, name: &str) -> Option<Id<MTerm>> {
        MasterMTerms::iter(self.masters.get(master).mterms, &self.mterms)
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| id)
    }

    pub fn mterm(&self, id: Id<MTerm>) -> &MTerm {
        self.mterms.get(id)
    }

    /// The terminals of `master` in creation order.
    pub fn mterms(&self, master: Id<Master>) -> impl Iterator<Item = (Id<MTerm>, &MTerm)> + '_ {
        MasterMTerms::iter(self.masters.get(master).mterms, &self.mterms)
    }

    pub fn num_mterms(&self, master: Id<Master>) -> usize {
        self.masters.get(master).num_mterms as usize
    }
}

impl PropertyScope for Lib {
    fn object_table(&self, kind: ObjectType) -> Option<&dyn ObjectTable> {
        match kind {
            ObjectType::Site => Some(&self.sites),
            ObjectType::Master => Some(&self.masters),
            ObjectType::MTerm => Some(&self.mterms),
            ObjectType::Property => Some(&self.props),
            ObjectType::Tech
            | ObjectType::Lib
            | ObjectType::Chip
            | ObjectType::Block
            | ObjectType::TechLayer
            | ObjectType::TechVia
            | ObjectType::ViaGenerateRule
            | ObjectType::NonDefaultRule
            | ObjectType::LayerRule
            | ObjectType::Inst
            | ObjectType::ITerm
            | ObjectType::Net
            | ObjectType::BTerm
            | ObjectType::BPin
            | ObjectType::Wire
            | ObjectType::SWire
            | ObjectType::SBox
            | ObjectType::Via
            | ObjectType::Row
            | ObjectType::TrackGrid
            | ObjectType::Region
            | ObjectType::Group
            | ObjectType::Blockage
            | ObjectType::Obstruction
            | ObjectType::Fill
            | ObjectType::PropertyDefinition => None,
        }
    }

    fn object_table_mut(&mut self, kind: ObjectType) -> Option<&mut dyn ObjectTable> {
        match kind {
            ObjectType::Site => Some(&mut self.sites),
            ObjectType::Master => Some(&mut self.masters),
            ObjectType::MTerm => Some(&mut self.mterms),
            ObjectType::Property => Some(&mut self.props),
            ObjectType::Tech
            | ObjectType::Lib
            | ObjectType::Chip
            | ObjectType::Block
            | ObjectType::TechLayer
            | ObjectType::TechVia
            | ObjectType::ViaGenerateRule
            | ObjectType::NonDefaultRule
            | ObjectType::LayerRule
            | ObjectType::Inst
            | ObjectType::ITerm
            | ObjectType::Net
            | ObjectType::BTerm
            | ObjectType::BPin
            | ObjectType::Wire
            | ObjectType::SWire
            | ObjectType::SBox
            | ObjectType::Via
            | ObjectType::Row
            | ObjectType::TrackGrid
            | ObjectType::Region
            | ObjectType::Group
            | ObjectType::Blockage
            | ObjectType::Obstruction
            | ObjectType::Fill
            | ObjectType::PropertyDefinition => None,
        }
    }

    fn properties(&self) -> &Table<Property> {
        &self.props
    }

    fn properties_mut(&mut self) -> &mut Table<Property> {
        &mut self.props
    }
}

//! Commonly used types.

pub use crate::block::{
    Block, Inst, MasterRef, Net, PlacementStatus, RuleRef, SBoxShape, ViaRef, WireEncoder,
    WireType,
};
pub use crate::id::Id;
pub use crate::library::{IoType, Lib, SigType};
pub use crate::object::{ObjectRef, ObjectType};
pub use crate::prop::{PropValue, PropertyScope};
pub use crate::tech::{LayerKind, Tech};
pub use crate::{BlockEditor, Chip, Database, Scope};

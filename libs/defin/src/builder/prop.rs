//! PROPERTYDEFINITIONS.
//!
//! Definitions are stored on the block. The value given for a `DESIGN`
//! definition is a property of the block itself, kept in the database
//! scope.

use lefdef::def::{CallbackResult, PropDataType, PropObject, PropertyDefinition};
use odb::block::{PropKind, PropTarget};
use odb::{Block, Id, PropertyScope};

use crate::base::{self, Session};
use crate::issue::IssueKind;

#[derive(Debug, Default)]
pub(crate) struct PropBuilder {
    created: usize,
    /// Whether the design properties of the block have been extended.
    design_props: bool,
}

fn target(object: PropObject) -> PropTarget {
    match object {
        PropObject::Design => PropTarget::Design,
        PropObject::Component => PropTarget::Component,
        PropObject::Net => PropTarget::Net,
        PropObject::SpecialNet => PropTarget::SpecialNet,
        PropObject::Group => PropTarget::Group,
        PropObject::Row => PropTarget::Row,
        PropObject::ComponentPin => PropTarget::ComponentPin,
        PropObject::Region => PropTarget::Region,
        PropObject::NonDefaultRule => PropTarget::NonDefaultRule,
    }
}

fn kind(data_type: PropDataType) -> PropKind {
    match data_type {
        PropDataType::Integer => PropKind::Integer,
        PropDataType::Real => PropKind::Real,
        PropDataType::String => PropKind::String,
    }
}

impl PropBuilder {
    pub fn build(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        def: PropertyDefinition,
    ) -> CallbackResult {
        let target = target(def.object);
        let kind = kind(def.data_type);
        let b = s.db.block_mut(block);
        let id = match b.create_property_definition(target, &def.name, kind) {
            Some(id) => {
                self.created += 1;
                id
            }
            None if s.policy.merge => match b.find_property_definition(target, &def.name) {
                Some(id) => id,
                None => return Ok(()),
            },
            None => {
                s.report(
                    230,
                    IssueKind::Invalid,
                    format!("duplicate property definition {} for {target:?}", def.name),
                );
                return Ok(());
            }
        };
        if def.range.is_some() {
            s.db.block_mut(block).property_definition_mut(id).range = def.range;
        }

        let Some(val) = &def.value else {
            return Ok(());
        };
        let Some(value) = base::parse_property(kind, val) else {
            s.report(
                122,
                IssueKind::Invalid,
                format!("invalid {kind:?} value {val:?} for property {}", def.name),
            );
            return Ok(());
        };
        if target != PropTarget::Design {
            s.db.block_mut(block).property_definition_mut(id).default = Some(value);
            return Ok(());
        }

        if !self.design_props {
            self.design_props = true;
            s.db.normalize_properties(block.into());
        }
        if s.db.create_property(block.into(), &def.name, value).is_none() {
            s.report(
                121,
                IssueKind::Invalid,
                format!("duplicate design property {}", def.name),
            );
        }
        Ok(())
    }

    /// Restores the creation order of the design properties.
    pub fn end(&mut self, s: &mut Session<'_>, block: Id<Block>) {
        if std::mem::take(&mut self.design_props) {
            s.db.normalize_properties(block.into());
        }
        if self.created > 0 {
            tracing::info!("    Created {} property definitions", self.created);
        }
    }
}

//! Non-default routing rules, used by both technologies and blocks.

use crate::id::Id;
use crate::object::impl_object;
use crate::stream::persist_fields;
use crate::table::Table;
use crate::tech::{TechLayer, TechVia, ViaGenerateRule};

/// A named override of default wire widths and spacings.
#[derive(Debug, Clone, PartialEq)]
pub struct NonDefaultRule {
    pub name: String,
    pub hard_spacing: bool,
    /// Whether the rule was defined by a design rather than the technology.
    pub block_rule: bool,
    pub layer_rules: Vec<Id<LayerRule>>,
    pub vias: Vec<Id<TechVia>>,
    pub via_rules: Vec<Id<ViaGenerateRule>>,
    pub min_cuts: Vec<(Id<TechLayer>, u32)>,
}

/// The widths and spacings a non-default rule applies on one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRule {
    pub ndr: Id<NonDefaultRule>,
    pub layer: Id<TechLayer>,
    pub width: i64,
    pub spacing: i64,
    pub wire_extension: i64,
    pub diag_width: i64,
}

impl_object!(NonDefaultRule, LayerRule);
persist_fields!(NonDefaultRule {
    name,
    hard_spacing,
    block_rule,
    layer_rules,
    vias,
    via_rules,
    min_cuts,
});
persist_fields!(LayerRule {
    ndr,
    layer,
    width,
    spacing,
    wire_extension,
    diag_width,
});

/// The non-default rules of one scope and their layer rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub(crate) ndrs: Table<NonDefaultRule>,
    pub(crate) layer_rules: Table<LayerRule>,
}

persist_fields!(RuleSet { ndrs, layer_rules });

impl RuleSet {
    /// Creates an empty rule. Returns `None` if the name is taken.
    pub fn create_ndr(&mut self, name: &str, block_rule: bool) -> Option<Id<NonDefaultRule>> {
        if self.find_ndr(name).is_some() {
            return None;
        }
        Some(self.ndrs.create(NonDefaultRule {
            name: name.to_string(),
            hard_spacing: false,
            block_rule,
            layer_rules: Vec::new(),
            vias: Vec::new(),
            via_rules: Vec::new(),
            min_cuts: Vec::new(),
        }))
    }

    pub fn find_ndr(&self, name: &str) -> Option<Id<NonDefaultRule>> {
        self.ndrs
            .iter()
            .find(|(_, r)| r.name == name)
            .map(|(id, _)| id)
    }

    pub fn ndr(&self, id: Id<NonDefaultRule>) -> &NonDefaultRule {
        self.ndrs.get(id)
    }

    pub fn ndr_mut(&mut self, id: Id<NonDefaultRule>) -> &mut NonDefaultRule {
        self.ndrs.get_mut(id)
    }

    pub fn ndrs(&self) -> impl Iterator<Item = (Id<NonDefaultRule>, &NonDefaultRule)> + '_ {
        self.ndrs.iter()
    }

    /// Adds a layer rule to `ndr`. Returns `None` if the layer already has one.
    pub fn create_layer_rule(
        &mut self,
        ndr: Id<NonDefaultRule>,
        layer: Id<TechLayer>,
        width: i64,
    ) -> Option<Id<LayerRule>> {
        if self.find_layer_rule(ndr, layer).is_some() {
            return None;
        }
        let id = self.layer_rules.create(LayerRule {
            ndr,
            layer,
            width,
            spacing: 0,
            wire_extension: 0,
            diag_width: 0,
        });
        self.ndrs.get_mut(ndr).layer_rules.push(id);
        Some(id)
    }

    pub fn find_layer_rule(
        &self,
        ndr: Id<NonDefaultRule>,
        layer: Id<TechLayer>,
    ) -> Option<Id<LayerRule>> {
        self.ndrs
            .get(ndr)
            .layer_rules
            .iter()
            .copied()
            .find(|&r| self.layer_rules.get(r).layer == layer)
    }

    pub fn layer_rule(&self, id: Id<LayerRule>) -> &LayerRule {
        self.layer_rules.get(id)
    }

    pub fn layer_rule_mut(&mut self, id: Id<LayerRule>) -> &mut LayerRule {
        self.layer_rules.get_mut(id)
    }

    /// Destroys a rule and its layer rules.
    pub fn destroy_ndr(&mut self, id: Id<NonDefaultRule>) {
        let rule = self.ndrs.destroy(id);
        for r in rule.layer_rules {
            self.layer_rules.destroy(r);
        }
    }
}

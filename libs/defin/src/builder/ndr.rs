//! NONDEFAULTRULES.

use lefdef::def::{CallbackResult, NonDefaultRule};
use odb::block::PropTarget;
use odb::{Block, Id};

use crate::base::Session;
use crate::issue::IssueKind;

#[derive(Debug, Default)]
pub(crate) struct NdrBuilder {
    created: usize,
}

impl NdrBuilder {
    pub fn build(
        &mut self,
        s: &mut Session<'_>,
        block: Id<Block>,
        rule: NonDefaultRule,
    ) -> CallbackResult {
        if s.policy.merge && s.db.block(block).rules.find_ndr(&rule.name).is_some() {
            return Ok(());
        }
        let Some(ndr) = s.db.block_mut(block).rules.create_ndr(&rule.name, true) else {
            s.report(
                195,
                IssueKind::Invalid,
                format!("duplicate non-default rule {}", rule.name),
            );
            return Ok(());
        };
        self.created += 1;
        s.db.block_mut(block).rules.ndr_mut(ndr).hard_spacing = rule.hard_spacing;

        for layer in &rule.layers {
            let Some(id) = s.find_layer(&layer.name) else {
                continue;
            };
            let u = s.units;
            let rules = &mut s.db.block_mut(block).rules;
            let Some(lr) = rules.create_layer_rule(ndr, id, u.dbdist(layer.width)) else {
                let message = format!("rule {} has two rules for layer {}", rule.name, layer.name);
                s.report(196, IssueKind::Invalid, message);
                continue;
            };
            let lr = rules.layer_rule_mut(lr);
            lr.spacing = layer.spacing.map_or(0, |v| u.dbdist(v));
            lr.wire_extension = layer.wire_ext.map_or(0, |v| u.dbdist(v));
            lr.diag_width = layer.diag_width.map_or(0, |v| u.dbdist(v));
        }

        let mut vias = Vec::new();
        for name in &rule.vias {
            match s.tech().find_via(name) {
                Some(via) => vias.push(via),
                None => s.report(
                    111,
                    IssueKind::Referential,
                    format!("undefined via {name}"),
                ),
            }
        }
        let mut via_rules = Vec::new();
        for name in &rule.via_rules {
            match s.tech().find_via_rule(name) {
                Some(via_rule) => via_rules.push(via_rule),
                None => s.report(
                    191,
                    IssueKind::Referential,
                    format!("undefined via rule {name}"),
                ),
            }
        }
        let mut min_cuts = Vec::new();
        for (layer, cuts) in &rule.min_cuts {
            if let Some(layer) = s.find_layer(layer) {
                min_cuts.push((layer, *cuts));
            }
        }
        let r = s.db.block_mut(block).rules.ndr_mut(ndr);
        r.vias = vias;
        r.via_rules = via_rules;
        r.min_cuts = min_cuts;

        s.add_properties(block, PropTarget::NonDefaultRule, ndr.into(), &rule.properties);
        Ok(())
    }

    pub fn end(&self) {
        if self.created > 0 {
            tracing::info!("    Created {} non-default rules", self.created);
        }
    }
}

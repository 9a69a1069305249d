//! REGIONS and GROUPS.

use lefdef::def::{self, CallbackResult, Group, Region};
use odb::block::{PropTarget, RegionKind};
use odb::{Block, Id};
use regex::Regex;

use crate::base::Session;
use crate::issue::IssueKind;

#[derive(Debug, Default)]
pub(crate) struct RegionBuilder {
    regions: usize,
    groups: usize,
}

fn region_kind(kind: Option<def::RegionKind>) -> RegionKind {
    match kind {
        Some(def::RegionKind::Fence) => RegionKind::Exclusive,
        Some(def::RegionKind::Guide) => RegionKind::Suggested,
        None => RegionKind::Inclusive,
    }
}

/// Matches component names against a group member, where `*` matches any
/// run of characters and `?` any one character.
fn member_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::with_capacity(pattern.len() + 2);
    re.push('^');
    let mut literal = String::new();
    for c in pattern.chars() {
        if c == '*' || c == '?' {
            re.push_str(&regex::escape(&literal));
            literal.clear();
            re.push_str(if c == '*' { ".*" } else { "." });
        } else {
            literal.push(c);
        }
    }
    re.push_str(&regex::escape(&literal));
    re.push('$');
    Regex::new(&re).ok()
}

impl RegionBuilder {
    pub fn region(&mut self, s: &mut Session<'_>, block: Id<Block>, region: Region) -> CallbackResult {
        let b = s.db.block_mut(block);
        let id = match b.create_region(&region.name) {
            Some(id) => id,
            None if s.policy.merge => match b.find_region(&region.name) {
                Some(id) => {
                    b.region_mut(id).boxes.clear();
                    id
                }
                None => return Ok(()),
            },
            None => {
                s.report(
                    210,
                    IssueKind::Invalid,
                    format!("duplicate region {}", region.name),
                );
                return Ok(());
            }
        };
        let boxes = region.rects.iter().map(|&r| s.units.rect(r)).collect();
        let r = s.db.block_mut(block).region_mut(id);
        r.kind = region_kind(region.kind);
        r.boxes = boxes;
        self.regions += 1;
        s.add_properties(block, PropTarget::Region, id.into(), &region.properties);
        Ok(())
    }

    pub fn group(&mut self, s: &mut Session<'_>, block: Id<Block>, group: Group) -> CallbackResult {
        let b = s.db.block_mut(block);
        let id = match b.create_group(&group.name) {
            Some(id) => id,
            None if s.policy.merge => match b.find_group(&group.name) {
                Some(id) => id,
                None => return Ok(()),
            },
            None => {
                s.report(
                    211,
                    IssueKind::Invalid,
                    format!("duplicate group {}", group.name),
                );
                return Ok(());
            }
        };
        self.groups += 1;

        for member in &group.members {
            let insts: Vec<_> = if member.contains(['*', '?']) {
                let Some(re) = member_regex(member) else {
                    continue;
                };
                s.db.block(block)
                    .insts()
                    .filter(|(_, inst)| re.is_match(&inst.name))
                    .map(|(id, _)| id)
                    .collect()
            } else {
                s.find_inst(block, member).into_iter().collect()
            };
            if insts.is_empty() {
                s.report(
                    212,
                    IssueKind::Referential,
                    format!("group {} member {member} matches no component", group.name),
                );
            }
            let b = s.db.block_mut(block);
            for inst in insts {
                b.add_group_inst(id, inst);
            }
        }

        if let Some(name) = &group.region {
            match s.db.block(block).find_region(name) {
                Some(region) => s.db.block_mut(block).group_mut(id).region = Some(region),
                None => s.report(
                    115,
                    IssueKind::Referential,
                    format!("undefined region {name}"),
                ),
            }
        }
        s.add_properties(block, PropTarget::Group, id.into(), &group.properties);
        Ok(())
    }

    pub fn end(&self) {
        if self.regions > 0 {
            tracing::info!("    Created {} regions", self.regions);
        }
        if self.groups > 0 {
            tracing::info!("    Created {} groups", self.groups);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::member_regex;

    #[test]
    fn member_patterns_match_component_names() {
        let re = member_regex("u1/*").unwrap();
        assert!(re.is_match("u1/a"));
        assert!(re.is_match("u1/"));
        assert!(!re.is_match("u10/a"));

        let re = member_regex("r?[0]").unwrap();
        assert!(re.is_match("ra[0]"));
        assert!(!re.is_match("rab[0]"));
    }
}

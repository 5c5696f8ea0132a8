//! Nearest-rule-wins lookup for a single subject-group

use crate::error::Result;
use crate::hierarchy::{HierarchyIndex, Slot};
use crate::rules::RuleStore;
use crate::types::{ResourceGroupId, RuleMatch, RuleRef, SubjectGroupId};

/// Per-group resolver over one snapshot's resource tree and rules
///
/// Walks from the queried resource-group towards its root and stops at the
/// first node where the group holds a rule, so a rule on a deeper node always
/// overrides one on a shallower ancestor.
#[derive(Debug, Clone, Copy)]
pub struct BranchResolver<'a> {
    resource_groups: &'a HierarchyIndex<ResourceGroupId>,
    rules: &'a RuleStore,
}

impl<'a> BranchResolver<'a> {
    pub fn new(resource_groups: &'a HierarchyIndex<ResourceGroupId>, rules: &'a RuleStore) -> Self {
        Self {
            resource_groups,
            rules,
        }
    }

    pub fn resource_groups(&self) -> &'a HierarchyIndex<ResourceGroupId> {
        self.resource_groups
    }

    /// Nearest rule of `group` on the path from `resource_group` to its root
    ///
    /// `Ok(None)` means the group has no opinion; it is not a deny by itself.
    ///
    /// # Errors
    ///
    /// `NotFound` if `resource_group` is not part of the snapshot.
    pub fn resolve(
        &self,
        group: SubjectGroupId,
        resource_group: ResourceGroupId,
    ) -> Result<Option<RuleMatch>> {
        let slot = self.resource_groups.require(resource_group)?;
        Ok(self.resolve_slot(group, slot))
    }

    pub(crate) fn resolve_slot(&self, group: SubjectGroupId, slot: Slot) -> Option<RuleMatch> {
        if !self.rules.has_rules(group) {
            return None;
        }

        for (distance, node) in self.resource_groups.ancestor_slots(slot).enumerate() {
            let resource_group = self.resource_groups.key(node);
            if let Some(polarity) = self.rules.rule_at(group, resource_group).effective() {
                return Some(RuleMatch {
                    rule: RuleRef {
                        subject_group: group,
                        resource_group,
                        polarity,
                    },
                    distance,
                });
            }
        }

        None
    }
}

//! Read-only view over Allow/Deny rule rows

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, Result};
use crate::types::{Polarity, ResourceGroupId, RuleRecord, RuleRef, SubjectGroupId};

/// Rule polarities held by one group on one resource-group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFlags {
    pub has_allow: bool,
    pub has_deny: bool,
}

impl RuleFlags {
    pub const NONE: RuleFlags = RuleFlags {
        has_allow: false,
        has_deny: false,
    };

    pub fn is_empty(&self) -> bool {
        !self.has_allow && !self.has_deny
    }

    /// Polarity at this node, deny winning when both are present
    pub fn effective(&self) -> Option<Polarity> {
        match (self.has_allow, self.has_deny) {
            (_, true) => Some(Polarity::Deny),
            (true, false) => Some(Polarity::Allow),
            (false, false) => None,
        }
    }

    fn set(&mut self, polarity: Polarity) -> bool {
        let slot = match polarity {
            Polarity::Allow => &mut self.has_allow,
            Polarity::Deny => &mut self.has_deny,
        };
        let fresh = !*slot;
        *slot = true;
        fresh
    }
}

/// Point-lookup surface keyed by (subject-group, resource-group)
///
/// No inference happens here; the branch resolver walks the resource tree
/// and asks this store one node at a time.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    flags: HashMap<(SubjectGroupId, ResourceGroupId), RuleFlags>,
    by_group: HashMap<SubjectGroupId, Vec<RuleRef>>,
    allow_count: usize,
    deny_count: usize,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one rule row
    ///
    /// # Errors
    ///
    /// [`AuthzError::DuplicateRule`] if the same key and polarity is already present.
    pub fn insert(&mut self, rule: RuleRecord) -> Result<()> {
        let entry = self
            .flags
            .entry((rule.subject_group, rule.resource_group))
            .or_default();

        if !entry.set(rule.polarity) {
            return Err(AuthzError::DuplicateRule(rule));
        }

        match rule.polarity {
            Polarity::Allow => self.allow_count += 1,
            Polarity::Deny => self.deny_count += 1,
        }
        self.by_group.entry(rule.subject_group).or_default().push(rule);
        Ok(())
    }

    /// Flags for `group` on exactly `resource_group` (no ancestor walk)
    pub fn rule_at(&self, group: SubjectGroupId, resource_group: ResourceGroupId) -> RuleFlags {
        self.flags
            .get(&(group, resource_group))
            .copied()
            .unwrap_or(RuleFlags::NONE)
    }

    /// Every rule attached directly to `group`, in ingestion order
    pub fn rules_of(&self, group: SubjectGroupId) -> &[RuleRef] {
        self.by_group.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `group` holds any rule at all
    pub fn has_rules(&self, group: SubjectGroupId) -> bool {
        self.by_group.contains_key(&group)
    }

    pub fn allow_count(&self) -> usize {
        self.allow_count
    }

    pub fn deny_count(&self) -> usize {
        self.deny_count
    }

    pub fn len(&self) -> usize {
        self.allow_count + self.deny_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

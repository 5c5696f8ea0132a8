//! Subject to subject-group resolution (direct and inherited)

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::hierarchy::HierarchyIndex;
use crate::types::{MembershipKind, SubjectGroupId, SubjectId};

/// Groups that apply to one subject, split by how they were reached
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSet {
    /// Groups with an explicit membership row
    pub direct: BTreeSet<SubjectGroupId>,

    /// Ancestors of direct groups that are not themselves direct
    pub inherited: BTreeSet<SubjectGroupId>,
}

impl GroupSet {
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty()
    }

    /// Classification of `group` for this subject, if it applies at all
    pub fn kind_of(&self, group: SubjectGroupId) -> Option<MembershipKind> {
        if self.direct.contains(&group) {
            Some(MembershipKind::Direct)
        } else if self.inherited.contains(&group) {
            Some(MembershipKind::Inherited)
        } else {
            None
        }
    }

    /// Direct groups first, then inherited ones, each tagged
    pub fn iter(&self) -> impl Iterator<Item = (SubjectGroupId, MembershipKind)> + '_ {
        self.direct
            .iter()
            .map(|&g| (g, MembershipKind::Direct))
            .chain(self.inherited.iter().map(|&g| (g, MembershipKind::Inherited)))
    }
}

/// Explicit memberships plus the subject-group tree used to expand them
#[derive(Debug, Clone, Default)]
pub struct MembershipResolver {
    direct: HashMap<SubjectId, BTreeSet<SubjectGroupId>>,
    row_count: usize,
}

impl MembershipResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an explicit membership; repeated rows are idempotent
    pub fn insert(&mut self, subject: SubjectId, group: SubjectGroupId) {
        if self.direct.entry(subject).or_default().insert(group) {
            self.row_count += 1;
        }
    }

    /// Directly assigned groups of `subject`
    pub fn direct_groups(&self, subject: SubjectId) -> impl Iterator<Item = SubjectGroupId> + '_ {
        self.direct
            .get(&subject)
            .into_iter()
            .flat_map(|groups| groups.iter().copied())
    }

    /// Direct groups and their ancestors for `subject`
    ///
    /// A group reached both directly and as the ancestor of another direct
    /// group is classified as direct.
    pub fn groups_for(
        &self,
        subject: SubjectId,
        subject_groups: &HierarchyIndex<SubjectGroupId>,
    ) -> GroupSet {
        let Some(direct) = self.direct.get(&subject) else {
            return GroupSet::default();
        };

        let mut inherited = BTreeSet::new();
        for &group in direct {
            let Some(slot) = subject_groups.slot(group) else {
                continue;
            };
            for ancestor in subject_groups.ancestor_slots(slot).skip(1) {
                let id = subject_groups.key(ancestor);
                // Chain above a direct or already-seen group is covered by its own walk
                if direct.contains(&id) || !inherited.insert(id) {
                    break;
                }
            }
        }

        GroupSet {
            direct: direct.clone(),
            inherited,
        }
    }

    /// Number of distinct membership rows
    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

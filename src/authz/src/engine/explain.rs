//! Per-subject explanations and the all-subjects access matrix

use serde::{Deserialize, Serialize};

use super::snapshot::Snapshot;
use crate::error::Result;
use crate::types::{
    MembershipKind, Polarity, ResourceGroupId, ResourceId, RuleRef, Subject, SubjectGroupId,
    SubjectId,
};

/// A group the subject belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub id: SubjectGroupId,
    pub name: String,
    pub kind: MembershipKind,
}

/// A rule held by one of the subject's groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub rule: RuleRef,
    pub group_name: String,
    pub resource_group_name: String,
    /// How the subject reaches the group holding the rule
    pub kind: MembershipKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub id: ResourceId,
    pub name: String,
}

/// Why a subject can access what it can
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub subject: Subject,
    pub generation: u64,
    /// Direct groups first, then inherited, each ordered by id
    pub groups: Vec<GroupEntry>,
    pub allow_rules: Vec<RuleEntry>,
    pub deny_rules: Vec<RuleEntry>,
    pub accessible: Vec<ResourceEntry>,
}

impl Explanation {
    pub fn direct_groups(&self) -> impl Iterator<Item = &GroupEntry> {
        self.groups
            .iter()
            .filter(|g| g.kind == MembershipKind::Direct)
    }

    pub fn inherited_groups(&self) -> impl Iterator<Item = &GroupEntry> {
        self.groups
            .iter()
            .filter(|g| g.kind == MembershipKind::Inherited)
    }
}

/// One subject's row of the access matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMatrixRow {
    pub subject: SubjectId,
    pub name: String,
    pub accessible: Vec<ResourceEntry>,
    pub resource_count: usize,
}

impl Snapshot {
    /// Groups, rules and accessible resources of `subject`
    pub fn explain(&self, subject: SubjectId) -> Result<Explanation> {
        let record = self.require_subject(subject)?.clone();
        let groups = self.groups_for(subject)?;

        let mut group_entries = Vec::with_capacity(groups.direct.len() + groups.inherited.len());
        let mut allow_rules = Vec::new();
        let mut deny_rules = Vec::new();

        let ordered = groups
            .direct
            .iter()
            .map(|&id| (id, MembershipKind::Direct))
            .chain(groups.inherited.iter().map(|&id| (id, MembershipKind::Inherited)));

        for (group, kind) in ordered {
            let group_name = self.group_name(group);
            group_entries.push(GroupEntry {
                id: group,
                name: group_name.clone(),
                kind,
            });

            for rule in self.rules().rules_of(group) {
                let entry = RuleEntry {
                    rule: *rule,
                    group_name: group_name.clone(),
                    resource_group_name: self.resource_group_name(rule.resource_group),
                    kind,
                };
                match rule.polarity {
                    Polarity::Allow => allow_rules.push(entry),
                    Polarity::Deny => deny_rules.push(entry),
                }
            }
        }

        let accessible = self.resource_entries(self.accessible(subject)?);

        Ok(Explanation {
            subject: record,
            generation: self.generation(),
            groups: group_entries,
            allow_rules,
            deny_rules,
            accessible,
        })
    }

    /// Accessible resources of every subject, ordered by subject name
    pub fn access_matrix(&self) -> Result<Vec<AccessMatrixRow>> {
        let mut subjects: Vec<&Subject> = self.subjects().collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        subjects
            .into_iter()
            .map(|subject| {
                let accessible = self.resource_entries(self.accessible(subject.id)?);
                Ok(AccessMatrixRow {
                    subject: subject.id,
                    name: subject.name.clone(),
                    resource_count: accessible.len(),
                    accessible,
                })
            })
            .collect()
    }

    fn resource_entries(&self, ids: impl IntoIterator<Item = ResourceId>) -> Vec<ResourceEntry> {
        ids.into_iter()
            .map(|id| ResourceEntry {
                id,
                name: self
                    .resource(id)
                    .map(|r| r.name.clone())
                    .unwrap_or_default(),
            })
            .collect()
    }

    fn group_name(&self, group: SubjectGroupId) -> String {
        self.subject_groups()
            .name(group)
            .unwrap_or_default()
            .to_string()
    }

    fn resource_group_name(&self, resource_group: ResourceGroupId) -> String {
        self.resource_groups()
            .name(resource_group)
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::fixture;
    use crate::types::{DanglingPolicy, MembershipKind, Polarity, SubjectId};

    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot::build(&fixture::rows(), 1, DanglingPolicy::Skip).unwrap()
    }

    #[test]
    fn test_explain_lists_groups_by_kind() {
        let explanation = snapshot().explain(fixture::TOM).unwrap();

        let direct: Vec<_> = explanation.direct_groups().map(|g| g.name.as_str()).collect();
        let inherited: Vec<_> = explanation
            .inherited_groups()
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(direct, vec!["Hardware-Entwicklung"]);
        assert_eq!(inherited, vec!["Alle Mitarbeiter", "Entwicklung"]);
    }

    #[test]
    fn test_explain_tags_rules() {
        let explanation = snapshot().explain(fixture::TOM).unwrap();

        assert!(explanation.allow_rules.iter().any(|r| {
            r.kind == MembershipKind::Direct && r.resource_group_name == "Hardware-Labor"
        }));
        assert_eq!(explanation.deny_rules.len(), 2);
        assert!(explanation
            .deny_rules
            .iter()
            .all(|r| r.kind == MembershipKind::Inherited && r.rule.polarity == Polarity::Deny));
    }

    #[test]
    fn test_explain_accessible() {
        let explanation = snapshot().explain(fixture::TOM).unwrap();
        let names: Vec<_> = explanation.accessible.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(names, vec!["Kaffeeküche", "Hardware-Labor"]);
    }

    #[test]
    fn test_explain_unknown_subject() {
        assert!(snapshot().explain(SubjectId(999)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_access_matrix_ordered_by_name() {
        let matrix = snapshot().access_matrix().unwrap();
        let names: Vec<_> = matrix.iter().map(|row| row.name.as_str()).collect();

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let max = matrix.iter().find(|row| row.subject == fixture::MAX).unwrap();
        assert_eq!(max.resource_count, 1);
        assert_eq!(max.accessible[0].id, fixture::KAFFEEKUECHE);
    }
}

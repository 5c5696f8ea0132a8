//! Immutable, versioned view of all access data

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::decision::Decision;
use crate::error::{AuthzError, Result};
use crate::hierarchy::HierarchyIndex;
use crate::membership::{GroupSet, MembershipResolver};
use crate::report::BuildReport;
use crate::resolver::{BranchResolver, Outcome, VerdictAggregator};
use crate::rules::RuleStore;
use crate::source::SourceRows;
use crate::types::{
    DanglingPolicy, EntityKind, Resource, ResourceGroupId, ResourceId, RuleMatch, Subject,
    SubjectGroupId, SubjectId, TreeKind,
};

/// Everything one decision needs, built once and never mutated
///
/// Queries take `&self` only, so any number of threads may decide against the
/// same snapshot concurrently.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    subjects: HashMap<SubjectId, Subject>,
    resources: HashMap<ResourceId, Resource>,
    subject_groups: HierarchyIndex<SubjectGroupId>,
    resource_groups: HierarchyIndex<ResourceGroupId>,
    rules: RuleStore,
    memberships: MembershipResolver,
    assignments: HashMap<ResourceId, ResourceGroupId>,
    /// Resources per resource-group, sorted by id
    members: HashMap<ResourceGroupId, Vec<ResourceId>>,
    report: BuildReport,
}

impl Snapshot {
    /// Build a snapshot from raw rows
    ///
    /// # Errors
    ///
    /// Fails on cycles, duplicate ids, duplicate rules, conflicting resource
    /// assignments and, under [`DanglingPolicy::Reject`], dangling references.
    pub fn build(rows: &SourceRows, generation: u64, policy: DanglingPolicy) -> Result<Self> {
        let mut report = BuildReport::new();

        let mut subjects = HashMap::with_capacity(rows.subjects.len());
        for subject in &rows.subjects {
            if subjects.insert(subject.id, subject.clone()).is_some() {
                return Err(AuthzError::DuplicateId {
                    kind: EntityKind::Subject,
                    id: subject.id.get(),
                });
            }
        }

        let mut resources = HashMap::with_capacity(rows.resources.len());
        for resource in &rows.resources {
            if resources.insert(resource.id, resource.clone()).is_some() {
                return Err(AuthzError::DuplicateId {
                    kind: EntityKind::Resource,
                    id: resource.id.get(),
                });
            }
        }

        let subject_groups = HierarchyIndex::build(
            TreeKind::SubjectGroups,
            &rows.subject_groups,
            policy,
            &mut report,
        )?;
        let resource_groups = HierarchyIndex::build(
            TreeKind::ResourceGroups,
            &rows.resource_groups,
            policy,
            &mut report,
        )?;

        let mut rules = RuleStore::new();
        for rule in &rows.rules {
            if !subject_groups.contains(rule.subject_group) {
                report.dangling(
                    policy,
                    format!("rule {} references unknown subject group", rule),
                )?;
                continue;
            }
            if !resource_groups.contains(rule.resource_group) {
                report.dangling(
                    policy,
                    format!("rule {} references unknown resource group", rule),
                )?;
                continue;
            }
            rules.insert(*rule)?;
        }

        let mut memberships = MembershipResolver::new();
        for membership in &rows.memberships {
            if !subjects.contains_key(&membership.subject) {
                report.dangling(
                    policy,
                    format!(
                        "membership of unknown subject {} in group {}",
                        membership.subject, membership.group
                    ),
                )?;
                continue;
            }
            if !subject_groups.contains(membership.group) {
                report.dangling(
                    policy,
                    format!(
                        "membership of subject {} in unknown group {}",
                        membership.subject, membership.group
                    ),
                )?;
                continue;
            }
            memberships.insert(membership.subject, membership.group);
        }

        let mut assignments = HashMap::with_capacity(rows.assignments.len());
        let mut members: HashMap<ResourceGroupId, Vec<ResourceId>> = HashMap::new();
        for assignment in &rows.assignments {
            if !resources.contains_key(&assignment.resource) {
                report.dangling(
                    policy,
                    format!("assignment of unknown resource {}", assignment.resource),
                )?;
                continue;
            }
            if !resource_groups.contains(assignment.resource_group) {
                report.dangling(
                    policy,
                    format!(
                        "resource {} assigned to unknown resource group {}",
                        assignment.resource, assignment.resource_group
                    ),
                )?;
                continue;
            }
            match assignments.insert(assignment.resource, assignment.resource_group) {
                Some(previous) if previous != assignment.resource_group => {
                    return Err(AuthzError::InvalidInput(format!(
                        "resource {} assigned to both resource groups {} and {}",
                        assignment.resource, previous, assignment.resource_group
                    )));
                }
                Some(_) => {}
                None => members
                    .entry(assignment.resource_group)
                    .or_default()
                    .push(assignment.resource),
            }
        }
        for resource_ids in members.values_mut() {
            resource_ids.sort_unstable();
        }

        info!(
            "Snapshot {}: {} subjects, {} groups, {} resources, {} areas, {} rules, {} skipped",
            generation,
            subjects.len(),
            subject_groups.len(),
            resources.len(),
            resource_groups.len(),
            rules.len(),
            report.skipped_count()
        );

        Ok(Self {
            generation,
            subjects,
            resources,
            subject_groups,
            resource_groups,
            rules,
            memberships,
            assignments,
            members,
            report,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.get(&id)
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    /// All subjects, in no particular order
    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.values()
    }

    pub fn subject_groups(&self) -> &HierarchyIndex<SubjectGroupId> {
        &self.subject_groups
    }

    pub fn resource_groups(&self) -> &HierarchyIndex<ResourceGroupId> {
        &self.resource_groups
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn memberships(&self) -> &MembershipResolver {
        &self.memberships
    }

    /// Leaf container of `resource`; `Ok(None)` if it is unassigned
    pub fn resource_group_of(&self, resource: ResourceId) -> Result<Option<ResourceGroupId>> {
        self.require_resource(resource)?;
        Ok(self.assignments.get(&resource).copied())
    }

    /// Resources placed directly in `resource_group`
    pub fn resources_in(&self, resource_group: ResourceGroupId) -> &[ResourceId] {
        self.members
            .get(&resource_group)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Direct and inherited groups of a known subject
    pub fn groups_for(&self, subject: SubjectId) -> Result<GroupSet> {
        self.require_subject(subject)?;
        Ok(self.memberships.groups_for(subject, &self.subject_groups))
    }

    /// Nearest rule of `group` for `resource_group`
    pub fn resolve(
        &self,
        group: SubjectGroupId,
        resource_group: ResourceGroupId,
    ) -> Result<Option<RuleMatch>> {
        self.subject_groups.require(group)?;
        self.branch().resolve(group, resource_group)
    }

    /// Decide access of `subject` to every resource in `resource_group`
    pub fn decide_resource_group(
        &self,
        subject: SubjectId,
        resource_group: ResourceGroupId,
    ) -> Result<Outcome> {
        let groups = self.groups_for(subject)?;
        self.aggregator().decide(&groups, resource_group)
    }

    /// Decide access of `subject` to `resource`
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown subject or resource. Every other case yields
    /// a verdict, defaulting to deny.
    pub fn decide(&self, subject: SubjectId, resource: ResourceId) -> Result<Decision> {
        let groups = self.groups_for(subject)?;
        let Some(resource_group) = self.resource_group_of(resource)? else {
            debug!("Resource {} is unassigned, denying", resource);
            return Ok(Decision::unassigned(subject, resource, self.generation));
        };

        let outcome = self.aggregator().decide(&groups, resource_group)?;
        let decision = Decision::from_outcome(subject, resource, self.generation, &outcome);

        debug!(
            "Decision for subject={} resource={}: {}",
            subject,
            resource,
            decision.summary()
        );
        Ok(decision)
    }

    /// Resource-groups `subject` may access
    pub fn accessible_resource_groups(
        &self,
        subject: SubjectId,
    ) -> Result<BTreeSet<ResourceGroupId>> {
        let groups = self.groups_for(subject)?;
        if groups.is_empty() {
            return Ok(BTreeSet::new());
        }

        let aggregator = self.aggregator();
        Ok((0..self.resource_groups.len())
            .filter(|&slot| aggregator.decide_slot(&groups, slot).verdict.is_allowed())
            .map(|slot| self.resource_groups.key(slot))
            .collect())
    }

    /// Resources `subject` may access, decided once per resource-group
    pub fn accessible(&self, subject: SubjectId) -> Result<BTreeSet<ResourceId>> {
        let groups = self.groups_for(subject)?;
        if groups.is_empty() {
            return Ok(BTreeSet::new());
        }

        let aggregator = self.aggregator();
        let mut accessible = BTreeSet::new();
        for (resource_group, resource_ids) in &self.members {
            let Some(slot) = self.resource_groups.slot(*resource_group) else {
                continue;
            };
            if aggregator.decide_slot(&groups, slot).verdict.is_allowed() {
                accessible.extend(resource_ids.iter().copied());
            }
        }
        Ok(accessible)
    }

    /// Resources `subject` may access, decided one resource at a time
    ///
    /// Slower than [`Snapshot::accessible`] and always equal to it.
    pub fn accessible_by_resource(&self, subject: SubjectId) -> Result<BTreeSet<ResourceId>> {
        let mut accessible = BTreeSet::new();
        for &resource in self.resources.keys() {
            if self.decide(subject, resource)?.allowed() {
                accessible.insert(resource);
            }
        }
        Ok(accessible)
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            generation: self.generation,
            subjects: self.subjects.len(),
            subject_groups: self.subject_groups.len(),
            resources: self.resources.len(),
            resource_groups: self.resource_groups.len(),
            assigned_resources: self.assignments.len(),
            memberships: self.memberships.len(),
            allow_rules: self.rules.allow_count(),
            deny_rules: self.rules.deny_count(),
            skipped_rows: self.report.skipped_count(),
        }
    }

    fn branch(&self) -> BranchResolver<'_> {
        BranchResolver::new(&self.resource_groups, &self.rules)
    }

    fn aggregator(&self) -> VerdictAggregator<'_> {
        VerdictAggregator::new(self.branch())
    }

    pub(super) fn require_subject(&self, subject: SubjectId) -> Result<&Subject> {
        self.subjects
            .get(&subject)
            .ok_or_else(|| AuthzError::not_found(EntityKind::Subject, subject))
    }

    fn require_resource(&self, resource: ResourceId) -> Result<&Resource> {
        self.resources
            .get(&resource)
            .ok_or_else(|| AuthzError::not_found(EntityKind::Resource, resource))
    }
}

/// Row counts of one snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub generation: u64,
    pub subjects: usize,
    pub subject_groups: usize,
    pub resources: usize,
    pub resource_groups: usize,
    pub assigned_resources: usize,
    pub memberships: usize,
    pub allow_rules: usize,
    pub deny_rules: usize,
    pub skipped_rows: usize,
}

//! Ingestion interface between the engine and the data-access layer

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AuthzError, Result};
use crate::types::{
    AssignmentRecord, MembershipRecord, Resource, ResourceGroupRecord, ResourceId, RuleRecord,
    Subject, SubjectGroupRecord, SubjectId,
};

/// Every row the engine needs to build one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRows {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub subject_groups: Vec<SubjectGroupRecord>,
    #[serde(default)]
    pub resource_groups: Vec<ResourceGroupRecord>,
    #[serde(default)]
    pub memberships: Vec<MembershipRecord>,
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
    #[serde(default)]
    pub assignments: Vec<AssignmentRecord>,
}

/// Pull-based data source read on every rebuild
///
/// Changes made behind the source are not visible to decisions until the
/// engine rebuilds.
#[async_trait]
pub trait AccessSource: Send + Sync {
    async fn list_subjects(&self) -> Result<Vec<Subject>>;

    async fn list_resources(&self) -> Result<Vec<Resource>>;

    async fn list_subject_groups(&self) -> Result<Vec<SubjectGroupRecord>>;

    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroupRecord>>;

    async fn list_memberships(&self) -> Result<Vec<MembershipRecord>>;

    async fn list_rules(&self) -> Result<Vec<RuleRecord>>;

    async fn list_resource_assignments(&self) -> Result<Vec<AssignmentRecord>>;

    /// Pull all lists in one go
    async fn fetch_rows(&self) -> Result<SourceRows> {
        Ok(SourceRows {
            subjects: self.list_subjects().await?,
            resources: self.list_resources().await?,
            subject_groups: self.list_subject_groups().await?,
            resource_groups: self.list_resource_groups().await?,
            memberships: self.list_memberships().await?,
            rules: self.list_rules().await?,
            assignments: self.list_resource_assignments().await?,
        })
    }
}

/// In-memory data source with the mutation calls of a request layer
pub struct InMemorySource {
    rows: Arc<RwLock<SourceRows>>,
}

impl InMemorySource {
    /// Create an empty in-memory source
    pub fn new() -> Self {
        Self::from_rows(SourceRows::default())
    }

    pub fn from_rows(rows: SourceRows) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
        }
    }

    /// Copy of the current rows
    pub async fn rows(&self) -> SourceRows {
        self.rows.read().await.clone()
    }

    pub async fn add_subject(&self, subject: Subject) {
        self.rows.write().await.subjects.push(subject);
    }

    pub async fn add_resource(&self, resource: Resource) {
        self.rows.write().await.resources.push(resource);
    }

    pub async fn add_subject_group(&self, group: SubjectGroupRecord) {
        self.rows.write().await.subject_groups.push(group);
    }

    pub async fn add_resource_group(&self, group: ResourceGroupRecord) {
        self.rows.write().await.resource_groups.push(group);
    }

    /// Add a membership row; returns `false` if it already existed
    pub async fn assign_membership(&self, membership: MembershipRecord) -> bool {
        let mut rows = self.rows.write().await;
        if rows.memberships.contains(&membership) {
            return false;
        }
        rows.memberships.push(membership);
        true
    }

    /// Remove a membership row; returns `false` if it was absent
    pub async fn remove_membership(&self, membership: MembershipRecord) -> bool {
        let mut rows = self.rows.write().await;
        let before = rows.memberships.len();
        rows.memberships.retain(|m| *m != membership);
        rows.memberships.len() != before
    }

    /// Add a rule row
    ///
    /// # Errors
    ///
    /// [`AuthzError::DuplicateRule`] if the same rule is already stored.
    pub async fn add_rule(&self, rule: RuleRecord) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows.rules.contains(&rule) {
            return Err(AuthzError::DuplicateRule(rule));
        }
        rows.rules.push(rule);
        Ok(())
    }

    /// Remove a rule row; returns `false` if it was absent
    pub async fn remove_rule(&self, rule: RuleRecord) -> bool {
        let mut rows = self.rows.write().await;
        let before = rows.rules.len();
        rows.rules.retain(|r| *r != rule);
        rows.rules.len() != before
    }

    /// Place a resource in a resource-group, replacing any previous assignment
    pub async fn assign_resource(&self, assignment: AssignmentRecord) {
        let mut rows = self.rows.write().await;
        rows.assignments.retain(|a| a.resource != assignment.resource);
        rows.assignments.push(assignment);
    }

    /// Remove a resource's assignment, leaving it unreachable
    pub async fn unassign_resource(&self, resource: ResourceId) -> bool {
        let mut rows = self.rows.write().await;
        let before = rows.assignments.len();
        rows.assignments.retain(|a| a.resource != resource);
        rows.assignments.len() != before
    }

    /// Remove a subject and its memberships
    pub async fn remove_subject(&self, subject: SubjectId) -> bool {
        let mut rows = self.rows.write().await;
        let before = rows.subjects.len();
        rows.subjects.retain(|s| s.id != subject);
        rows.memberships.retain(|m| m.subject != subject);
        rows.subjects.len() != before
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessSource for InMemorySource {
    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        Ok(self.rows.read().await.subjects.clone())
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        Ok(self.rows.read().await.resources.clone())
    }

    async fn list_subject_groups(&self) -> Result<Vec<SubjectGroupRecord>> {
        Ok(self.rows.read().await.subject_groups.clone())
    }

    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroupRecord>> {
        Ok(self.rows.read().await.resource_groups.clone())
    }

    async fn list_memberships(&self) -> Result<Vec<MembershipRecord>> {
        Ok(self.rows.read().await.memberships.clone())
    }

    async fn list_rules(&self) -> Result<Vec<RuleRecord>> {
        Ok(self.rows.read().await.rules.clone())
    }

    async fn list_resource_assignments(&self) -> Result<Vec<AssignmentRecord>> {
        Ok(self.rows.read().await.assignments.clone())
    }

    /// Single consistent read instead of seven separate ones
    async fn fetch_rows(&self) -> Result<SourceRows> {
        Ok(self.rows.read().await.clone())
    }
}

//! Core access-control types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw numeric value of the id
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Subject identifier (a user in the door-access deployment)
    SubjectId
);
define_id!(
    /// Subject-group identifier
    SubjectGroupId
);
define_id!(
    /// Resource identifier (a door in the door-access deployment)
    ResourceId
);
define_id!(
    /// Resource-group identifier
    ResourceGroupId
);

/// Which of the two forests a hierarchy describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    SubjectGroups,
    ResourceGroups,
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeKind::SubjectGroups => write!(f, "subject-group"),
            TreeKind::ResourceGroups => write!(f, "resource-group"),
        }
    }
}

/// Entity kinds, used in error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Subject,
    SubjectGroup,
    Resource,
    ResourceGroup,
}

impl From<TreeKind> for EntityKind {
    fn from(tree: TreeKind) -> Self {
        match tree {
            TreeKind::SubjectGroups => EntityKind::SubjectGroup,
            TreeKind::ResourceGroups => EntityKind::ResourceGroup,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Subject => "Subject",
            EntityKind::SubjectGroup => "Subject group",
            EntityKind::Resource => "Resource",
            EntityKind::ResourceGroup => "Resource group",
        };
        f.write_str(name)
    }
}

/// Rule polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarity {
    /// Grant access
    Allow,
    /// Revoke access
    Deny,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Allow => write!(f, "ALLOW"),
            Polarity::Deny => write!(f, "DENY"),
        }
    }
}

/// Final access verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Allow,
    Deny,
}

impl Verdict {
    pub fn is_allowed(self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

impl From<Polarity> for Verdict {
    fn from(polarity: Polarity) -> Self {
        match polarity {
            Polarity::Allow => Verdict::Allow,
            Polarity::Deny => Verdict::Deny,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow => write!(f, "ALLOW"),
            Verdict::Deny => write!(f, "DENY"),
        }
    }
}

/// How a subject reaches a subject-group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipKind {
    /// Explicit membership row
    Direct,
    /// Reached only by walking up from a direct group
    Inherited,
}

/// How ingestion treats rows that reference unknown ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingPolicy {
    /// Drop the row, log it and keep building
    #[default]
    Skip,
    /// Abort the build with [`crate::AuthzError::DanglingReference`]
    Reject,
}

impl std::str::FromStr for DanglingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(DanglingPolicy::Skip),
            "reject" => Ok(DanglingPolicy::Reject),
            other => Err(format!("unknown dangling policy '{}'", other)),
        }
    }
}

/// Reference to a single rule row, used as the decision trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleRef {
    pub subject_group: SubjectGroupId,
    pub resource_group: ResourceGroupId,
    pub polarity: Polarity,
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "group {} {} resource-group {}",
            self.subject_group, self.polarity, self.resource_group
        )
    }
}

/// A rule found while walking a resource-group's ancestor chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    /// The deciding rule
    pub rule: RuleRef,

    /// Edges between the queried resource-group and the rule's node (0 = same node)
    pub distance: usize,
}

impl RuleMatch {
    pub fn polarity(&self) -> Polarity {
        self.rule.polarity
    }
}

/// Subject (user, badge holder, service account)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,

    /// Display name
    pub name: String,

    /// Opaque display attributes (e.g., email)
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Subject {
    /// Create a subject with a display name
    pub fn new(id: impl Into<SubjectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute to the subject
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Protected resource (door, room, device)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,

    /// Display name
    pub name: String,

    /// Opaque display attributes (e.g., location)
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Resource {
    /// Create a resource with a display name
    pub fn new(id: impl Into<ResourceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute to the resource
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Group row with an optional parent link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord<K> {
    pub id: K,
    pub name: String,
    /// Absent for a root; a missing key deserializes as `None`
    pub parent: Option<K>,
}

impl<K> GroupRecord<K> {
    /// Root group (no parent)
    pub fn root(id: impl Into<K>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent: None,
        }
    }

    /// Group nested under `parent`
    pub fn child(id: impl Into<K>, name: impl Into<String>, parent: impl Into<K>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent: Some(parent.into()),
        }
    }
}

/// Subject-group row
pub type SubjectGroupRecord = GroupRecord<SubjectGroupId>;

/// Resource-group row
pub type ResourceGroupRecord = GroupRecord<ResourceGroupId>;

/// Explicit (subject, group) membership row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub subject: SubjectId,
    pub group: SubjectGroupId,
}

impl MembershipRecord {
    pub fn new(subject: impl Into<SubjectId>, group: impl Into<SubjectGroupId>) -> Self {
        Self {
            subject: subject.into(),
            group: group.into(),
        }
    }
}

/// Allow/Deny rule row
pub type RuleRecord = RuleRef;

impl RuleRef {
    pub fn new(
        subject_group: impl Into<SubjectGroupId>,
        resource_group: impl Into<ResourceGroupId>,
        polarity: Polarity,
    ) -> Self {
        Self {
            subject_group: subject_group.into(),
            resource_group: resource_group.into(),
            polarity,
        }
    }

    pub fn allow(
        subject_group: impl Into<SubjectGroupId>,
        resource_group: impl Into<ResourceGroupId>,
    ) -> Self {
        Self::new(subject_group, resource_group, Polarity::Allow)
    }

    pub fn deny(
        subject_group: impl Into<SubjectGroupId>,
        resource_group: impl Into<ResourceGroupId>,
    ) -> Self {
        Self::new(subject_group, resource_group, Polarity::Deny)
    }
}

/// Resource-to-resource-group assignment row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub resource: ResourceId,
    pub resource_group: ResourceGroupId,
}

impl AssignmentRecord {
    pub fn new(
        resource: impl Into<ResourceId>,
        resource_group: impl Into<ResourceGroupId>,
    ) -> Self {
        Self {
            resource: resource.into(),
            resource_group: resource_group.into(),
        }
    }
}

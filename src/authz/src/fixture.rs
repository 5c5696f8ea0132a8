//! Canonical demo organization
//!
//! ```text
//! Alle Mitarbeiter                 Allgemeine Bereiche ── Kaffeeküche
//! ├── Entwicklung                  Entwicklungsbereiche
//! │   ├── Hardware-Entwicklung     ├── Hardware-Labor
//! │   └── Software-Entwicklung     └── Software-Bereich
//! └── IT                           IT-Bereiche
//! ```
//!
//! Used by the demo binary, the docs and the tests.

use crate::source::{InMemorySource, SourceRows};
use crate::types::{
    AssignmentRecord, GroupRecord, MembershipRecord, Resource, ResourceGroupId, ResourceId,
    RuleRef, Subject, SubjectGroupId, SubjectId,
};

pub const ALLE_MITARBEITER: SubjectGroupId = SubjectGroupId(1);
pub const ENTWICKLUNG: SubjectGroupId = SubjectGroupId(2);
pub const HARDWARE_ENTWICKLUNG: SubjectGroupId = SubjectGroupId(3);
pub const SOFTWARE_ENTWICKLUNG: SubjectGroupId = SubjectGroupId(4);
pub const IT: SubjectGroupId = SubjectGroupId(5);

pub const ENTWICKLUNGSBEREICHE: ResourceGroupId = ResourceGroupId(1);
pub const HARDWARE_LABOR_GROUP: ResourceGroupId = ResourceGroupId(2);
pub const SOFTWARE_BEREICH_GROUP: ResourceGroupId = ResourceGroupId(3);
pub const ALLGEMEINE_BEREICHE: ResourceGroupId = ResourceGroupId(4);
pub const KAFFEEKUECHE_GROUP: ResourceGroupId = ResourceGroupId(5);
pub const IT_BEREICHE: ResourceGroupId = ResourceGroupId(6);

/// Directly in Entwicklung
pub const MAX: SubjectId = SubjectId(1);
/// Directly in Software-Entwicklung
pub const ANNA: SubjectId = SubjectId(2);
/// Directly in Hardware-Entwicklung
pub const TOM: SubjectId = SubjectId(3);
/// Directly in IT
pub const LISA: SubjectId = SubjectId(4);
/// In no group at all
pub const PETER: SubjectId = SubjectId(5);

pub const KAFFEEKUECHE: ResourceId = ResourceId(2);
pub const HARDWARE_LABOR: ResourceId = ResourceId(5);
pub const SOFTWARE_BEREICH: ResourceId = ResourceId(6);
pub const SERVERRAUM: ResourceId = ResourceId(10);
/// Not assigned to any resource-group
pub const ABSTELLRAUM: ResourceId = ResourceId(99);

/// All rows of the demo organization
pub fn rows() -> SourceRows {
    SourceRows {
        subjects: vec![
            Subject::new(MAX, "Max Mustermann"),
            Subject::new(ANNA, "Anna Schmidt"),
            Subject::new(TOM, "Tom Hardware"),
            Subject::new(LISA, "Lisa Admin"),
            Subject::new(PETER, "Peter Neu"),
        ],
        resources: vec![
            Resource::new(KAFFEEKUECHE, "Kaffeeküche").with_attribute("floor", "EG"),
            Resource::new(HARDWARE_LABOR, "Hardware-Labor").with_attribute("floor", "1"),
            Resource::new(SOFTWARE_BEREICH, "Software-Bereich").with_attribute("floor", "1"),
            Resource::new(SERVERRAUM, "Serverraum").with_attribute("floor", "UG"),
            Resource::new(ABSTELLRAUM, "Abstellraum"),
        ],
        subject_groups: vec![
            GroupRecord::root(ALLE_MITARBEITER, "Alle Mitarbeiter"),
            GroupRecord::child(ENTWICKLUNG, "Entwicklung", ALLE_MITARBEITER),
            GroupRecord::child(HARDWARE_ENTWICKLUNG, "Hardware-Entwicklung", ENTWICKLUNG),
            GroupRecord::child(SOFTWARE_ENTWICKLUNG, "Software-Entwicklung", ENTWICKLUNG),
            GroupRecord::child(IT, "IT", ALLE_MITARBEITER),
        ],
        resource_groups: vec![
            GroupRecord::root(ENTWICKLUNGSBEREICHE, "Entwicklungsbereiche"),
            GroupRecord::child(HARDWARE_LABOR_GROUP, "Hardware-Labor", ENTWICKLUNGSBEREICHE),
            GroupRecord::child(SOFTWARE_BEREICH_GROUP, "Software-Bereich", ENTWICKLUNGSBEREICHE),
            GroupRecord::root(ALLGEMEINE_BEREICHE, "Allgemeine Bereiche"),
            GroupRecord::child(KAFFEEKUECHE_GROUP, "Kaffeeküche", ALLGEMEINE_BEREICHE),
            GroupRecord::root(IT_BEREICHE, "IT-Bereiche"),
        ],
        memberships: vec![
            MembershipRecord::new(MAX, ENTWICKLUNG),
            MembershipRecord::new(ANNA, SOFTWARE_ENTWICKLUNG),
            MembershipRecord::new(TOM, HARDWARE_ENTWICKLUNG),
            MembershipRecord::new(LISA, IT),
        ],
        rules: vec![
            RuleRef::allow(ALLE_MITARBEITER, ALLGEMEINE_BEREICHE),
            RuleRef::allow(ENTWICKLUNG, ENTWICKLUNGSBEREICHE),
            RuleRef::deny(ENTWICKLUNG, HARDWARE_LABOR_GROUP),
            RuleRef::deny(ENTWICKLUNG, SOFTWARE_BEREICH_GROUP),
            RuleRef::allow(HARDWARE_ENTWICKLUNG, HARDWARE_LABOR_GROUP),
            RuleRef::allow(IT, IT_BEREICHE),
        ],
        assignments: vec![
            AssignmentRecord::new(KAFFEEKUECHE, KAFFEEKUECHE_GROUP),
            AssignmentRecord::new(HARDWARE_LABOR, HARDWARE_LABOR_GROUP),
            AssignmentRecord::new(SOFTWARE_BEREICH, SOFTWARE_BEREICH_GROUP),
            AssignmentRecord::new(SERVERRAUM, IT_BEREICHE),
        ],
    }
}

/// The demo organization behind a mutable source
pub fn source() -> InMemorySource {
    InMemorySource::from_rows(rows())
}

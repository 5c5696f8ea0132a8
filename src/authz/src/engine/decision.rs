//! Access decision types with an auditable trace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resolver::Outcome;
use crate::types::{MembershipKind, ResourceId, RuleRef, SubjectId, Verdict};

/// Access decision with the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Unique decision ID
    pub id: String,

    pub subject: SubjectId,

    pub resource: ResourceId,

    pub verdict: Verdict,

    /// Deciding rule; `None` for a default deny
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<RuleRef>,

    /// Why the verdict came out this way
    pub reason: DecisionReason,

    /// Snapshot generation the decision was computed against
    pub generation: u64,

    pub timestamp: DateTime<Utc>,
}

impl Decision {
    /// Build a decision from an aggregated outcome
    pub fn from_outcome(
        subject: SubjectId,
        resource: ResourceId,
        generation: u64,
        outcome: &Outcome,
    ) -> Self {
        let reason = match (outcome.level, outcome.deciding) {
            (Some(MembershipKind::Direct), Some(found)) => DecisionReason::DirectRule {
                distance: found.distance,
            },
            (Some(MembershipKind::Inherited), Some(found)) => DecisionReason::InheritedRule {
                distance: found.distance,
            },
            _ => DecisionReason::NoApplicableRule,
        };

        Self::new(
            subject,
            resource,
            generation,
            outcome.verdict,
            outcome.deciding.map(|found| found.rule),
            reason,
        )
    }

    /// Deny for a resource that sits in no resource-group
    pub fn unassigned(subject: SubjectId, resource: ResourceId, generation: u64) -> Self {
        Self::new(
            subject,
            resource,
            generation,
            Verdict::Deny,
            None,
            DecisionReason::ResourceUnassigned,
        )
    }

    fn new(
        subject: SubjectId,
        resource: ResourceId,
        generation: u64,
        verdict: Verdict,
        trace: Option<RuleRef>,
        reason: DecisionReason,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            subject,
            resource,
            verdict,
            trace,
            reason,
            generation,
            timestamp: Utc::now(),
        }
    }

    pub fn allowed(&self) -> bool {
        self.verdict.is_allowed()
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        match (&self.reason, self.trace) {
            (DecisionReason::DirectRule { .. }, Some(rule)) => {
                format!("{} by direct rule: {}", self.verdict, rule)
            }
            (DecisionReason::InheritedRule { .. }, Some(rule)) => {
                format!("{} by inherited rule: {}", self.verdict, rule)
            }
            (DecisionReason::ResourceUnassigned, _) => {
                format!("{}: resource {} is in no resource group", self.verdict, self.resource)
            }
            _ => format!("{}: no applicable rule, default deny", self.verdict),
        }
    }
}

/// Reason for an access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecisionReason {
    /// A rule of a directly assigned group decided
    DirectRule { distance: usize },

    /// Direct groups were silent and an inherited group's rule decided
    InheritedRule { distance: usize },

    /// No group expressed an opinion
    NoApplicableRule,

    /// Resource is not placed in any resource-group
    ResourceUnassigned,
}

//! Two-axis combination of branch results into one verdict

use serde::{Deserialize, Serialize};

use super::branch::BranchResolver;
use crate::error::Result;
use crate::hierarchy::Slot;
use crate::membership::GroupSet;
use crate::types::{MembershipKind, Polarity, ResourceGroupId, RuleMatch, SubjectGroupId, Verdict};

/// Combined opinion of a set of equally-ranked groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "rule")]
pub enum LevelVerdict {
    /// No group in the set holds an applicable rule
    NoOpinion,
    /// At least one group allows and none denies
    Allow(RuleMatch),
    /// At least one group denies
    Deny(RuleMatch),
}

impl LevelVerdict {
    pub fn polarity(&self) -> Option<Polarity> {
        match self {
            LevelVerdict::NoOpinion => None,
            LevelVerdict::Allow(_) => Some(Polarity::Allow),
            LevelVerdict::Deny(_) => Some(Polarity::Deny),
        }
    }

    pub fn rule_match(&self) -> Option<&RuleMatch> {
        match self {
            LevelVerdict::NoOpinion => None,
            LevelVerdict::Allow(m) | LevelVerdict::Deny(m) => Some(m),
        }
    }
}

/// Result of aggregating one (subject, resource-group) query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub verdict: Verdict,

    /// Rule behind the verdict; `None` means default deny
    pub deciding: Option<RuleMatch>,

    /// Membership level that produced the verdict
    pub level: Option<MembershipKind>,
}

impl Outcome {
    fn default_deny() -> Self {
        Self {
            verdict: Verdict::Deny,
            deciding: None,
            level: None,
        }
    }

    fn decided(level: MembershipKind, result: LevelVerdict) -> Option<Self> {
        let deciding = *result.rule_match()?;
        Some(Self {
            verdict: deciding.polarity().into(),
            deciding: Some(deciding),
            level: Some(level),
        })
    }
}

/// Combines branch results across the direct/inherited split
#[derive(Debug, Clone, Copy)]
pub struct VerdictAggregator<'a> {
    branch: BranchResolver<'a>,
}

impl<'a> VerdictAggregator<'a> {
    pub fn new(branch: BranchResolver<'a>) -> Self {
        Self { branch }
    }

    pub fn branch(&self) -> &BranchResolver<'a> {
        &self.branch
    }

    /// Decide access to `resource_group` for a subject with `groups`
    ///
    /// # Errors
    ///
    /// `NotFound` if `resource_group` is not part of the snapshot.
    pub fn decide(&self, groups: &GroupSet, resource_group: ResourceGroupId) -> Result<Outcome> {
        let slot = self.branch.resource_groups().require(resource_group)?;
        Ok(self.decide_slot(groups, slot))
    }

    pub(crate) fn decide_slot(&self, groups: &GroupSet, slot: Slot) -> Outcome {
        let direct = self.scan(groups.direct.iter().copied(), slot);
        if let Some(outcome) = Outcome::decided(MembershipKind::Direct, direct) {
            return outcome;
        }

        // Direct groups are all silent, so the union reduces to the inherited set
        let inherited = self.scan(groups.inherited.iter().copied(), slot);
        Outcome::decided(MembershipKind::Inherited, inherited).unwrap_or_else(Outcome::default_deny)
    }

    /// Effective opinion of one set of equally-ranked groups
    ///
    /// Any deny in the set beats any allow in the set. The reported rule is
    /// the nearest one of the winning polarity, ties broken by group id.
    pub(crate) fn scan<I>(&self, groups: I, slot: Slot) -> LevelVerdict
    where
        I: IntoIterator<Item = SubjectGroupId>,
    {
        let mut allow: Option<RuleMatch> = None;
        let mut deny: Option<RuleMatch> = None;

        for group in groups {
            let Some(found) = self.branch.resolve_slot(group, slot) else {
                continue;
            };
            let best = match found.polarity() {
                Polarity::Allow => &mut allow,
                Polarity::Deny => &mut deny,
            };
            if best.as_ref().map_or(true, |current| precedes(&found, current)) {
                *best = Some(found);
            }
        }

        match (deny, allow) {
            (Some(d), _) => LevelVerdict::Deny(d),
            (None, Some(a)) => LevelVerdict::Allow(a),
            (None, None) => LevelVerdict::NoOpinion,
        }
    }
}

fn precedes(candidate: &RuleMatch, current: &RuleMatch) -> bool {
    (candidate.distance, candidate.rule.subject_group)
        < (current.distance, current.rule.subject_group)
}

//! Rule resolution across the two hierarchies
//!
//! Resolution happens in two steps:
//!
//! 1. [`BranchResolver`] answers, for one subject-group, which rule is
//!    nearest to a resource-group on its path to the resource-tree root
//!    (deny wins when both polarities sit on the same node).
//! 2. [`VerdictAggregator`] combines the per-group answers: direct groups
//!    decide outright when any of them has an opinion, otherwise the
//!    inherited groups decide, and silence everywhere means deny.
//!
//! ```text
//! subject ──► GroupSet { direct, inherited }
//!                 │
//!                 ├─ direct:    Resolve(g, RG) ∀ g ──► Effective ──┐
//!                 │                                    (ALLOW/DENY wins outright)
//!                 └─ inherited: Resolve(g, RG) ∀ g ──► Effective ──┤ (only if direct silent)
//!                                                                  ▼
//!                                                          Verdict + trace
//! ```

pub mod aggregate;
pub mod branch;


pub use aggregate::{LevelVerdict, Outcome, VerdictAggregator};
pub use branch::BranchResolver;

//! # Tiered Access Engine
//!
//! Two-hierarchy access control: subjects belong to a tree of subject-groups,
//! resources live in a tree of resource-groups, and groups hold ALLOW or DENY
//! rules against resource-groups.
//!
//! ## Resolution
//!
//! - **Nearest rule wins** along the resource-group chain; on one node a
//!   DENY beats an ALLOW.
//! - **Deny wins** among groups of equal rank.
//! - **Direct beats inherited**: a directly assigned group with an opinion
//!   decides outright, inherited groups only speak when direct ones are silent.
//! - **Default deny** when nobody has an opinion.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tiered_authz::{fixture, AccessEngine, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = AccessEngine::new(EngineConfig::default(), Arc::new(fixture::source())).await?;
//!
//!     let decision = engine.check(fixture::TOM, fixture::HARDWARE_LABOR)?;
//!     if decision.allowed() {
//!         println!("Access granted: {}", decision.summary());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod fixture;
pub mod hierarchy;
pub mod membership;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use engine::{
    AccessEngine, AccessMatrixRow, Decision, DecisionReason, EngineConfig, Explanation, Snapshot,
    SnapshotStats,
};
pub use error::{AuthzError, Result};
pub use hierarchy::HierarchyIndex;
pub use membership::{GroupSet, MembershipResolver};
pub use report::BuildReport;
pub use resolver::{BranchResolver, Outcome, VerdictAggregator};
pub use rules::RuleStore;
pub use source::{AccessSource, InMemorySource, SourceRows};
pub use types::{
    AssignmentRecord, DanglingPolicy, GroupRecord, MembershipKind, MembershipRecord, Polarity,
    Resource, ResourceGroupId, ResourceId, RuleRef, Subject, SubjectGroupId, SubjectId, Verdict,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for the access engine

use crate::types::{EntityKind, RuleRef, TreeKind};
use thiserror::Error;

/// Access engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A parent chain does not terminate (fatal at build time)
    #[error("Cycle detected in {tree} hierarchy: {path}")]
    Cycle {
        /// Which tree contains the cycle
        tree: TreeKind,
        /// Node ids along the cycle, joined with " -> "
        path: String,
    },

    /// Unknown id referenced by a query
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        kind: EntityKind,
        /// The unknown id
        id: u64,
    },

    /// A row references an id absent from the snapshot
    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    /// The same (group, resource-group, polarity) key was ingested twice
    #[error("Duplicate rule: {0}")]
    DuplicateRule(RuleRef),

    /// The same id appears twice in one entity list
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId {
        /// Kind of entity with the clash
        kind: EntityKind,
        /// The duplicated id
        id: u64,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Data source failed to deliver rows
    #[error("Data source error: {0}")]
    Source(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    /// Shorthand for a [`AuthzError::NotFound`]
    pub fn not_found(kind: EntityKind, id: impl Into<u64>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether the error is a per-call lookup failure rather than a build failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for access engine operations
pub type Result<T> = std::result::Result<T, AuthzError>;

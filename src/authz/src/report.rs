//! Build-time bookkeeping for skipped ingestion rows

use crate::error::{AuthzError, Result};
use crate::types::DanglingPolicy;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Summary of a snapshot build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Rows dropped under [`DanglingPolicy::Skip`], one description each
    pub skipped: Vec<String>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `policy` to a row that references an unknown id
    pub(crate) fn dangling(&mut self, policy: DanglingPolicy, detail: String) -> Result<()> {
        match policy {
            DanglingPolicy::Reject => Err(AuthzError::DanglingReference(detail)),
            DanglingPolicy::Skip => {
                warn!("Skipping row with dangling reference: {}", detail);
                self.skipped.push(detail);
                Ok(())
            }
        }
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

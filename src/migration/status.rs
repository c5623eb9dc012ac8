//! Migration status tracking

use crate::migration::MigrationFile;

/// Migration status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Versions listed in the ledger, ascending
    pub applied: Vec<String>,

    /// Files on disk that the ledger does not list, in on-disk order
    pub pending: Vec<MigrationFile>,
}

impl MigrationStatus {
    #[must_use]
    pub fn new(applied: Vec<String>, pending: Vec<MigrationFile>) -> Self {
        Self { applied, pending }
    }

    /// Check if all migrations are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn pending_versions(&self) -> Vec<String> {
        self.pending.iter().map(|m| m.version.clone()).collect()
    }

    #[must_use]
    pub fn latest_applied_version(&self) -> Option<&str> {
        self.applied.iter().max().map(String::as_str)
    }

    #[must_use]
    pub fn next_pending_version(&self) -> Option<&str> {
        self.pending.first().map(|m| m.version.as_str())
    }
}

//! Migration-specific error types

use crate::LifeError;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// Database execution error
    Database(LifeError),
    /// Migrations directory missing or unreadable
    FileNotFound(String),
    /// Invalid migration file or directory
    InvalidFormat(String),
    /// Migrations on disk that the ledger does not list, in on-disk order
    Pending(Vec<String>),
    /// A ledger or on-disk version has no registered migration
    NotRegistered { version: String },
    /// Two migrations registered under one version
    AlreadyRegistered { version: String, name: String },
    /// Migration failed during execution
    ExecutionFailed {
        version: String,
        name: String,
        error: String,
    },
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Database(e) => write!(f, "Database error: {}", e),
            MigrationError::FileNotFound(path) => write!(f, "Migrations not found: {}", path),
            MigrationError::InvalidFormat(msg) => write!(f, "Invalid migration format: {}", msg),
            MigrationError::Pending(versions) => {
                write!(
                    f,
                    "Pending migrations: {}\n\
                     Run the pending migrations before starting the application.",
                    versions.join(", ")
                )
            }
            MigrationError::NotRegistered { version } => {
                write!(f, "No migration registered for version {}", version)
            }
            MigrationError::AlreadyRegistered { version, name } => {
                write!(
                    f,
                    "Migration '{}' (version {}) is already registered",
                    name, version
                )
            }
            MigrationError::ExecutionFailed {
                version,
                name,
                error,
            } => {
                write!(
                    f,
                    "Migration '{}' (version {}) failed during execution: {}",
                    name, version, error
                )
            }
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LifeError> for MigrationError {
    fn from(error: LifeError) -> Self {
        MigrationError::Database(error)
    }
}

//! Error types for model operations.

use super::HookSlot;
use crate::cache::CacheError;
use crate::executor::LifeError;
use serde_json::Value as JsonValue;
use std::fmt;

/// A single attribute failed a validation rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub model: String,
    pub attribute: String,
    pub value: JsonValue,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Validation failed for {}.{} ({}): {}",
            self.model, self.attribute, self.value, self.message
        )
    }
}

impl std::error::Error for ValidationError {}

/// Error type for model operations
#[derive(Debug)]
pub enum ModelError {
    /// Rejected by a validation rule before anything was written
    Validation(ValidationError),
    /// A lifecycle hook returned an error
    Hook { slot: HookSlot, message: String },
    /// Attempt to change the primary key of a persisted record
    ImmutablePrimaryKey { model: String },
    /// Update or delete of a record with no primary key value
    MissingPrimaryKey { model: String },
    /// Statement failed in the executor
    Database(LifeError),
    /// Cache key could not be derived
    Cache(CacheError),
}

impl ModelError {
    /// Convenience for hook callbacks.
    pub fn hook(slot: HookSlot, message: impl Into<String>) -> Self {
        ModelError::Hook {
            slot,
            message: message.into(),
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Validation(e) => write!(f, "{e}"),
            ModelError::Hook { slot, message } => {
                write!(f, "{slot} hook failed: {message}")
            }
            ModelError::ImmutablePrimaryKey { model } => {
                write!(f, "Primary key of a persisted {model} cannot be changed")
            }
            ModelError::MissingPrimaryKey { model } => {
                write!(f, "{model} has no primary key value")
            }
            ModelError::Database(e) => write!(f, "Database error: {e}"),
            ModelError::Cache(e) => write!(f, "Cache error: {e}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Validation(e) => Some(e),
            ModelError::Database(e) => Some(e),
            ModelError::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for ModelError {
    fn from(err: ValidationError) -> Self {
        ModelError::Validation(err)
    }
}

impl From<LifeError> for ModelError {
    fn from(err: LifeError) -> Self {
        ModelError::Database(err)
    }
}

impl From<CacheError> for ModelError {
    fn from(err: CacheError) -> Self {
        ModelError::Cache(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError {
            model: "Post".to_string(),
            attribute: "title".to_string(),
            value: JsonValue::Null,
            message: "must be present".to_string(),
        };
        assert_eq!(err.to_string(), "Validation failed for Post.title (null): must be present");
    }

    #[test]
    fn test_hook_error_names_slot() {
        let err = ModelError::hook(HookSlot::BeforeSave, "nope");
        assert_eq!(err.to_string(), "beforeSave hook failed: nope");
    }
}

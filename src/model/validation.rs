//! Attribute validation rules.

use super::ValidationError;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

pub type Predicate = Arc<dyn Fn(&JsonValue) -> bool + Send + Sync>;

#[derive(Clone)]
struct Rule {
    attribute: String,
    message: String,
    predicate: Predicate,
}

/// Ordered list of `(attribute, message, predicate)` rules.
#[derive(Clone, Default)]
pub struct Validations {
    rules: Vec<Rule>,
}

impl Validations {
    pub fn push(&mut self, attribute: impl Into<String>, message: impl Into<String>, predicate: Predicate) {
        self.rules.push(Rule {
            attribute: attribute.into(),
            message: message.into(),
            predicate,
        });
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check rules in declaration order and report the first failure.
    ///
    /// `lookup` yields the current value of an attribute; absent attributes
    /// are checked as `null`.
    pub fn check<'a, F>(&self, model: &str, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<&'a JsonValue>,
    {
        for rule in &self.rules {
            let value = lookup(&rule.attribute).unwrap_or(&JsonValue::Null);
            if !(rule.predicate)(value) {
                return Err(ValidationError {
                    model: model.to_string(),
                    attribute: rule.attribute.clone(),
                    value: value.clone(),
                    message: rule.message.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Validations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| (&r.attribute, &r.message)))
            .finish()
    }
}

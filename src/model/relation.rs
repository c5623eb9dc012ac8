//! Relationship declarations and their resolved form.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationType {
    BelongsTo,
    HasOne,
    HasMany,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::BelongsTo => "belongsTo",
            RelationType::HasOne => "hasOne",
            RelationType::HasMany => "hasMany",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relationship as declared on a [`ModelDef`](super::ModelDef).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub name: String,
    pub kind: RelationType,
    /// Name of the related model.
    pub target_model: String,
    /// For `belongsTo` an attribute of the declaring model, otherwise an
    /// attribute of the target model.
    pub foreign_key: String,
}

/// A relationship bound to its target model's table layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelationship {
    pub name: String,
    pub kind: RelationType,
    pub target_model: String,
    pub target_table: String,
    /// Primary key attribute of the target model.
    pub target_primary_key: String,
    pub target_primary_key_column: String,
    /// Storage column of the foreign key, on whichever side holds it.
    pub foreign_key_column: String,
    /// `(attribute, column)` pairs of the target model, in declaration order.
    pub target_attributes: Vec<(String, String)>,
}

impl ResolvedRelationship {
    pub fn target_column(&self, attribute: &str) -> Option<&str> {
        self.target_attributes
            .iter()
            .find(|(attr, _)| attr == attribute)
            .map(|(_, column)| column.as_str())
    }
}

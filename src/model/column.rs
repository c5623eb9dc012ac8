//! Attribute column metadata.

use convert_case::{Case, Casing};

/// Storage and document names of one model attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name in the database table.
    pub column_name: String,
    /// Member name in JSON API documents.
    pub doc_name: String,
}

impl Column {
    pub fn new(column_name: impl Into<String>, doc_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            doc_name: doc_name.into(),
        }
    }

    /// `authorId` is stored as `author_id` and documented as `author-id`.
    pub fn for_attribute(name: &str) -> Self {
        Self::new(name.to_case(Case::Snake), name.to_case(Case::Kebab))
    }
}

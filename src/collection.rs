//! Read-only query results.

use crate::model::Record;
use std::collections::BTreeMap;
use std::slice;

/// Relationship name to the joined column labels selected for it.
pub type RelatedBag = BTreeMap<String, Vec<String>>;

/// Ordered records produced by one query execution.
///
/// Built once on a cache miss and then shared, so there are no mutating
/// methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    model_name: String,
    records: Vec<Record>,
    total: u64,
    related: RelatedBag,
}

impl Collection {
    pub fn new(model_name: impl Into<String>, records: Vec<Record>, related: RelatedBag) -> Self {
        let total = records.len() as u64;
        Self {
            model_name: model_name.into(),
            records,
            total,
            related,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records, used for pagination links.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn related(&self) -> &RelatedBag {
        &self.related
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    pub fn iter(&self) -> slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

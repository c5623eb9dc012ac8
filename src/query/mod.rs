//! Lazy, chainable query building.
//!
//! A [`Query`] records every call as an [`Operation`] in its [`Snapshot`]
//! and touches the database only in [`Query::execute`]. Execution consults
//! the model's cache first, keyed by the hash of the table name and the
//! snapshot, and stores the built [`Collection`](crate::Collection) on a
//! miss.
//!
//! ```no_run
//! use lux_model::{Direction, Model};
//! use serde_json::json;
//!
//! # fn demo(posts: Model) -> Result<(), lux_model::ModelError> {
//! let recent = posts
//!     .where_([("authorId", json!(1))])
//!     .order("createdAt", Direction::Desc)
//!     .page(2)
//!     .execute()?;
//! let one = posts.find(42).execute()?.into_record();
//! # let _ = (recent, one);
//! # Ok(())
//! # }
//! ```

pub mod execution;
pub mod include;
pub mod snapshot;

pub use execution::Fetched;
pub use include::IncludeSpec;
pub use snapshot::{Direction, Join, Operation, ParseDirectionError, SelectColumn, Snapshot};

use crate::cache::{create_hash, CacheError, CacheValue};
use crate::model::{Model, ModelError};
use crate::table::Statement;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Serialize)]
struct CacheKey<'a> {
    table: &'a str,
    snapshot: &'a Snapshot,
}

/// Fluent query over one model.
#[derive(Debug, Clone)]
pub struct Query {
    model: Model,
    collection: bool,
    snapshot: Snapshot,
}

impl Query {
    pub(crate) fn new(model: Model) -> Self {
        Self {
            model,
            collection: true,
            snapshot: Snapshot::new(),
        }
    }

    /// Select everything. Records nothing.
    pub fn all(self) -> Self {
        self
    }

    /// Single record by primary key. Execution yields [`Fetched::One`].
    pub fn find(mut self, pk: impl Into<JsonValue>) -> Self {
        self.collection = false;
        self.snapshot.push(Operation::Limit(1));
        let mut params = BTreeMap::new();
        params.insert(self.model.primary_key().to_string(), pk.into());
        self.snapshot.push(Operation::Where(params));
        self
    }

    /// One-based page. Reuses an earlier `limit`, otherwise records the
    /// model's default page size.
    pub fn page(mut self, num: i64) -> Self {
        let limit = match self.snapshot.limit() {
            Some(limit) => limit,
            None => {
                let limit = self.model.default_per_page();
                self.snapshot.push(Operation::Limit(limit));
                limit
            }
        };
        let skipped = num.saturating_sub(1).max(0) as u64;
        self.snapshot.push(Operation::Offset(skipped.saturating_mul(limit)));
        self
    }

    pub fn limit(mut self, amount: u64) -> Self {
        self.snapshot.push(Operation::Limit(amount));
        self
    }

    pub fn offset(mut self, amount: u64) -> Self {
        self.snapshot.push(Operation::Offset(amount));
        self
    }

    /// Sort by an attribute. Qualified `table.column` names pass through.
    pub fn order(mut self, attribute: &str, direction: Direction) -> Self {
        let column = if attribute.contains('.') {
            attribute.to_string()
        } else {
            format!(
                "{}.{}",
                self.model.table_name(),
                self.model.column_name(attribute)
            )
        };
        self.snapshot.push(Operation::OrderBy { column, direction });
        self
    }

    /// Equality conditions.
    ///
    /// Arrays of two or more values become `IN`, a single-element array
    /// compares with its element and an empty array or `None` with `IS NULL`.
    pub fn where_<K, V, I>(mut self, params: I) -> Self
    where
        K: Into<String>,
        V: Into<JsonValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let (exact, within) = partition_where(params);
        if !exact.is_empty() {
            self.snapshot.push(Operation::Where(exact));
        }
        if !within.is_empty() {
            self.snapshot.push(Operation::WhereIn(within));
        }
        self
    }

    /// Restrict the selected attributes. Undeclared names are ignored.
    pub fn select<S: AsRef<str>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        let columns = self.select_columns(attributes);
        if !columns.is_empty() {
            self.snapshot.push(Operation::Select(columns));
        }
        self
    }

    /// Join `belongsTo` and `hasOne` relationships into the result.
    pub fn include(mut self, spec: impl Into<IncludeSpec>) -> Self {
        for op in include::include_operations(&self.model, spec.into()) {
            self.snapshot.push(op);
        }
        self
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Hash identifying this query in the cache.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Serialization` if the snapshot cannot be encoded.
    pub fn cache_key(&self) -> Result<String, CacheError> {
        create_hash(&CacheKey {
            table: self.model.table_name(),
            snapshot: &self.snapshot,
        })
    }

    /// SQL that [`execute`](Self::execute) would issue on a cache miss.
    pub fn to_sql_string(&self) -> String {
        let snapshot = self.with_default_select();
        Statement::from(execution::build_select(&self.model, &snapshot)).to_sql_string()
    }

    /// Run the query, answering from the cache when possible.
    ///
    /// # Errors
    ///
    /// Executor failures are returned unmodified as `ModelError::Database`.
    pub fn execute(self) -> Result<Fetched, ModelError> {
        #[cfg(feature = "tracing")]
        let _span =
            crate::metrics::tracing_helpers::query_execute_span(self.model.name(), self.collection)
                .entered();

        let cache = self.model.cache();
        let key = cache.key_from_hash(&self.cache_key()?);

        let collection = match cache.lookup(&key) {
            Some(CacheValue::Collection(hit)) => hit,
            _ => {
                let snapshot = self.with_default_select();
                let select = execution::build_select(&self.model, &snapshot);
                let rows = self.model.table().fetch(select)?;
                let built = Arc::new(execution::collect(&self.model, &snapshot, rows));
                log::debug!(
                    "{} query fetched {} records",
                    self.model.name(),
                    built.len()
                );
                cache.put(&key, CacheValue::Collection(built.clone()));
                built
            }
        };

        if self.collection {
            Ok(Fetched::Many(collection))
        } else {
            Ok(Fetched::One(collection.first().cloned()))
        }
    }

    fn select_columns<S: AsRef<str>>(&self, attributes: impl IntoIterator<Item = S>) -> Vec<SelectColumn> {
        let table = self.model.table_name();
        attributes
            .into_iter()
            .filter(|attr| self.model.has_attribute(attr.as_ref()))
            .map(|attr| {
                let attr = attr.as_ref();
                SelectColumn {
                    table: table.to_string(),
                    column: self.model.column_name(attr).to_string(),
                    alias: attr.to_string(),
                }
            })
            .collect()
    }

    fn with_default_select(&self) -> Snapshot {
        let mut snapshot = self.snapshot.clone();
        if !snapshot.has_select() {
            let columns = self.select_columns(self.model.attribute_names());
            snapshot.push(Operation::Select(columns));
        }
        snapshot
    }
}

/// Split `where` parameters into exact-match and `IN` conditions.
///
/// Arrays of two or more values go to the `IN` map. A single-element array
/// becomes its element and an empty array becomes `null`.
pub(crate) fn partition_where<K, V, I>(
    params: I,
) -> (BTreeMap<String, JsonValue>, BTreeMap<String, Vec<JsonValue>>)
where
    K: Into<String>,
    V: Into<JsonValue>,
    I: IntoIterator<Item = (K, V)>,
{
    let mut exact = BTreeMap::new();
    let mut within = BTreeMap::new();
    for (key, value) in params {
        let key = key.into();
        match value.into() {
            JsonValue::Array(mut items) => match items.len() {
                0 => {
                    exact.insert(key, JsonValue::Null);
                }
                1 => {
                    exact.insert(key, items.remove(0));
                }
                _ => {
                    within.insert(key, items);
                }
            },
            other => {
                exact.insert(key, other);
            }
        }
    }
    (exact, within)
}

//! Active-record style models.
//!
//! A [`ModelDef`] describes a table: its attributes, relationships, hooks
//! and validation rules. [`Database::define`](crate::Database::define) turns
//! each definition into a [`Model`], a cheap handle bound to the table, the
//! shared executor and the shared cache. Query entrypoints on the model build
//! a fresh [`Query`]; `create` and `count` run immediately; instances are
//! [`Record`]s.

pub mod column;
pub mod def;
pub mod error;
pub mod hooks;
pub mod record;
pub mod relation;
pub mod validation;

pub use column::Column;
pub use def::{ModelDef, ModelDefBuilder};
pub use error::{ModelError, ValidationError};
pub use hooks::{HookFn, HookSlot, Hooks};
pub use record::{FormatTarget, Record};
pub use relation::{RelationType, Relationship, ResolvedRelationship};

use crate::cache::Cache;
use crate::query::{partition_where, Direction, IncludeSpec, Query};
use crate::table::TableAccessor;
use crate::value::json_to_value;
use record::{CREATED_AT, UPDATED_AT};
use sea_query::{Alias, ConditionalStatement, Expr, ExprTrait};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Attribute name to value.
pub type Attributes = serde_json::Map<String, JsonValue>;

struct ModelInner {
    def: ModelDef,
    table: TableAccessor,
    cache: Arc<Cache>,
    relationships: BTreeMap<String, ResolvedRelationship>,
}

/// Handle to a defined model. Clones share the same binding.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    pub(crate) fn new(
        def: ModelDef,
        table: TableAccessor,
        cache: Arc<Cache>,
        relationships: BTreeMap<String, ResolvedRelationship>,
    ) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                def,
                table,
                cache,
                relationships,
            }),
        }
    }

    pub fn def(&self) -> &ModelDef {
        &self.inner.def
    }

    pub fn name(&self) -> &str {
        self.inner.def.name()
    }

    pub fn table_name(&self) -> &str {
        self.inner.def.table_name()
    }

    pub fn primary_key(&self) -> &str {
        self.inner.def.primary_key()
    }

    pub fn default_per_page(&self) -> u64 {
        self.inner.def.default_per_page()
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.inner.def.attribute_names()
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.inner.def.has_attribute(attribute)
    }

    /// Storage column of `attribute`, or `attribute` itself when undeclared.
    pub fn column_name<'a>(&'a self, attribute: &'a str) -> &'a str {
        self.inner
            .def
            .column(attribute)
            .map_or(attribute, |c| c.column_name.as_str())
    }

    pub fn relationship(&self, name: &str) -> Option<&ResolvedRelationship> {
        self.inner.relationships.get(name)
    }

    pub fn table(&self) -> &TableAccessor {
        &self.inner.table
    }

    pub fn cache(&self) -> &Cache {
        &self.inner.cache
    }

    pub fn all(&self) -> Query {
        Query::new(self.clone()).all()
    }

    pub fn find(&self, pk: impl Into<JsonValue>) -> Query {
        Query::new(self.clone()).find(pk)
    }

    pub fn page(&self, num: i64) -> Query {
        Query::new(self.clone()).page(num)
    }

    pub fn limit(&self, amount: u64) -> Query {
        Query::new(self.clone()).limit(amount)
    }

    pub fn offset(&self, amount: u64) -> Query {
        Query::new(self.clone()).offset(amount)
    }

    pub fn order(&self, attribute: &str, direction: Direction) -> Query {
        Query::new(self.clone()).order(attribute, direction)
    }

    pub fn where_<K, V, I>(&self, params: I) -> Query
    where
        K: Into<String>,
        V: Into<JsonValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Query::new(self.clone()).where_(params)
    }

    pub fn select<S: AsRef<str>>(&self, attributes: impl IntoIterator<Item = S>) -> Query {
        Query::new(self.clone()).select(attributes)
    }

    pub fn include(&self, spec: impl Into<IncludeSpec>) -> Query {
        Query::new(self.clone()).include(spec)
    }

    /// A transient record holding the declared attributes of `props`.
    pub fn build<K, I>(&self, props: I) -> Record
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, JsonValue)>,
    {
        let mut record = Record::transient(self.clone());
        // Transient records have no primary key to protect.
        let _ = record.assign(props);
        record
    }

    /// Validate, insert and return a persisted record.
    ///
    /// Hook order: beforeValidation, validation, afterValidation,
    /// beforeCreate, beforeSave, insert, afterCreate, afterSave. Any failure
    /// before the insert means nothing is written. Attributes assigned by
    /// afterCreate or afterSave are kept in memory only.
    pub fn create<K, I>(&self, props: I) -> Result<Record, ModelError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, JsonValue)>,
    {
        let mut record = self.build(props);
        let now = record::timestamp();
        record.touch(CREATED_AT, &now);
        record.touch(UPDATED_AT, &now);

        self.run_hook(HookSlot::BeforeValidation, &mut record)?;
        self.validate(&record)?;
        self.run_hook(HookSlot::AfterValidation, &mut record)?;
        self.run_hook(HookSlot::BeforeCreate, &mut record)?;
        self.run_hook(HookSlot::BeforeSave, &mut record)?;

        let pk_column = self.column_name(self.primary_key()).to_string();
        let mut row = record.format(FormatTarget::Database, &[]);
        row.remove(&pk_column);

        let table = self.table();
        let mut stmt = table.insert();
        if row.is_empty() {
            stmt.or_default_values();
        } else {
            stmt.columns(row.keys().map(|c| Alias::new(c.as_str())));
            stmt.values(row.values().map(|v| Expr::val(json_to_value(v))))
                .map_err(|e| crate::LifeError::QueryError(e.to_string()))?;
        }
        stmt.returning_col(Alias::new(pk_column.as_str()));

        let rows = table.fetch(stmt)?;
        let id = rows
            .first()
            .and_then(|r| r.get(&pk_column))
            .cloned()
            .unwrap_or(JsonValue::Null);
        record.mark_persisted(id);

        record.run_after_write([HookSlot::AfterCreate, HookSlot::AfterSave])?;
        Ok(record)
    }

    /// `SELECT COUNT(*)` with equality conditions.
    ///
    /// Parameters are read like those of [`where_`](Self::where_). A count
    /// that cannot be parsed yields 0.
    pub fn count<K, V, I>(&self, params: I) -> Result<u64, ModelError>
    where
        K: Into<String>,
        V: Into<JsonValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let table = self.table();
        let mut stmt = table.select();
        stmt.expr_as(Expr::cust("COUNT(*)"), Alias::new("count"));
        let (exact, within) = partition_where(params);
        for (key, value) in &exact {
            stmt.and_where(self.condition(key, value));
        }
        for (key, values) in within {
            stmt.and_where(self.condition(&key, &JsonValue::Array(values)));
        }

        let rows = table.fetch(stmt)?;
        Ok(rows
            .first()
            .and_then(|r| r.get("count"))
            .map_or(0, parse_count))
    }

    pub(crate) fn run_hook(&self, slot: HookSlot, record: &mut Record) -> Result<(), ModelError> {
        self.inner.def.hooks().run(slot, record)
    }

    pub(crate) fn validate(&self, record: &Record) -> Result<(), ValidationError> {
        self.inner
            .def
            .validations()
            .check(self.name(), |attribute| record.get(attribute))
    }

    /// Resolve a `where` key to `(table, column)`.
    ///
    /// `table.column` keys are taken as written; anything else is an
    /// attribute of this model.
    pub(crate) fn qualify(&self, key: &str) -> (String, String) {
        match key.split_once('.') {
            Some((table, column)) => (table.to_string(), column.to_string()),
            None => (
                self.table_name().to_string(),
                self.column_name(key).to_string(),
            ),
        }
    }

    /// Equality condition on a `where` key. `null` compares with `IS NULL`,
    /// arrays with `IN`.
    pub(crate) fn condition(&self, key: &str, value: &JsonValue) -> Expr {
        let (table, column) = self.qualify(key);
        let col = Expr::col((Alias::new(table), Alias::new(column)));
        match value {
            JsonValue::Null => col.is_null(),
            JsonValue::Array(items) => col.is_in(items.iter().map(json_to_value)),
            other => col.eq(json_to_value(other)),
        }
    }
}

fn parse_count(value: &JsonValue) -> u64 {
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        JsonValue::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name())
            .field("table", &self.table_name())
            .field("primary_key", &self.primary_key())
            .finish_non_exhaustive()
    }
}

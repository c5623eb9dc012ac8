//! Model instances.

use super::{Attributes, HookSlot, Model, ModelError};
use crate::value::json_to_value;
use chrono::{SecondsFormat, Utc};
use sea_query::{Alias, ConditionalStatement, Expr, ExprTrait};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub(crate) const CREATED_AT: &str = "createdAt";
pub(crate) const UPDATED_AT: &str = "updatedAt";

/// Current time as an RFC 3339 UTC string.
pub(crate) fn timestamp() -> JsonValue {
    JsonValue::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Projection target of [`Record::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTarget {
    /// Keys are storage column names.
    Database,
    /// Keys are JSON API member names.
    JsonApi,
}

/// One row of a model.
///
/// A record is transient until it has been inserted; after that its primary
/// key is fixed. Changes go through [`update`](Self::update), which writes
/// only the attributes that differ from the last persisted values.
#[derive(Clone)]
pub struct Record {
    model: Model,
    attributes: Attributes,
    initialized: bool,
    initial_values: Attributes,
    dirty: BTreeSet<String>,
    related: BTreeMap<String, Attributes>,
}

impl Record {
    pub(crate) fn transient(model: Model) -> Self {
        Self {
            model,
            attributes: Attributes::new(),
            initialized: false,
            initial_values: Attributes::new(),
            dirty: BTreeSet::new(),
            related: BTreeMap::new(),
        }
    }

    /// A record loaded from the database.
    pub(crate) fn persisted(
        model: Model,
        attributes: Attributes,
        related: BTreeMap<String, Attributes>,
    ) -> Self {
        Self {
            model,
            initial_values: attributes.clone(),
            attributes,
            initialized: true,
            dirty: BTreeSet::new(),
            related,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn get(&self, attribute: &str) -> Option<&JsonValue> {
        self.attributes.get(attribute)
    }

    /// Primary key value, if set and not null.
    pub fn id(&self) -> Option<&JsonValue> {
        self.get(self.model.primary_key()).filter(|v| !v.is_null())
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Related rows loaded through `include`, by relationship name.
    pub fn related(&self, relationship: &str) -> Option<&Attributes> {
        self.related.get(relationship)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_attributes(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Assign one attribute.
    ///
    /// Unknown attributes are ignored. On a persisted record the attribute is
    /// marked dirty only when the value differs from the persisted one.
    /// Intended for hooks; application code should go through
    /// [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// `ModelError::ImmutablePrimaryKey` when changing the primary key of a
    /// persisted record.
    pub fn set(&mut self, attribute: &str, value: JsonValue) -> Result<(), ModelError> {
        if !self.model.has_attribute(attribute) {
            log::debug!("{} has no attribute {attribute:?}, ignoring", self.model.name());
            return Ok(());
        }
        if self.initialized
            && attribute == self.model.primary_key()
            && self.attributes.get(attribute) != Some(&value)
        {
            return Err(ModelError::ImmutablePrimaryKey {
                model: self.model.name().to_string(),
            });
        }
        if self.initialized {
            if self.initial_values.get(attribute) == Some(&value) {
                self.dirty.remove(attribute);
            } else {
                self.dirty.insert(attribute.to_string());
            }
        }
        self.attributes.insert(attribute.to_string(), value);
        Ok(())
    }

    pub(crate) fn assign<K, I>(&mut self, props: I) -> Result<(), ModelError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, JsonValue)>,
    {
        for (key, value) in props {
            self.set(&key.into(), value)?;
        }
        Ok(())
    }

    /// Stamp a declared timestamp attribute.
    pub(crate) fn touch(&mut self, attribute: &str, now: &JsonValue) {
        if self.model.has_attribute(attribute) {
            if self.initialized {
                self.dirty.insert(attribute.to_string());
            }
            self.attributes.insert(attribute.to_string(), now.clone());
        }
    }

    /// Record the inserted primary key and freeze it.
    pub(crate) fn mark_persisted(&mut self, id: JsonValue) {
        let pk = self.model.primary_key().to_string();
        self.attributes.insert(pk, id);
        self.initialized = true;
        self.rebase();
    }

    /// Take the current attributes as the persisted state.
    fn rebase(&mut self) {
        self.initial_values = self.attributes.clone();
        self.dirty.clear();
    }

    /// Run the after-write hooks, then rebase.
    ///
    /// Attributes assigned by these hooks stay in memory but are not
    /// written, and the record comes back clean either way.
    pub(crate) fn run_after_write(&mut self, slots: [HookSlot; 2]) -> Result<(), ModelError> {
        let model = self.model.clone();
        let result = slots
            .into_iter()
            .try_for_each(|slot| model.run_hook(slot, self));
        self.rebase();
        result
    }

    /// Merge `props` and persist whatever changed.
    ///
    /// With nothing dirty this returns immediately without touching the
    /// database. Otherwise it runs beforeValidation, validation,
    /// afterValidation, beforeUpdate and beforeSave, refreshes `updatedAt`,
    /// writes the dirty columns, then runs afterUpdate and afterSave. When
    /// the before-hooks revert every change nothing is written and the
    /// after-hooks do not run.
    ///
    /// A failure before the write restores the previous attribute values.
    /// Hook side effects are not rolled back, and there is no transaction
    /// around the write.
    pub fn update<K, I>(&mut self, props: I) -> Result<(), ModelError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, JsonValue)>,
    {
        let saved = self.attributes.clone();

        if let Err(err) = self.assign(props) {
            self.restore(saved);
            return Err(err);
        }
        if !self.is_dirty() {
            return Ok(());
        }
        match self.write_update() {
            Ok(true) => self.run_after_write([HookSlot::AfterUpdate, HookSlot::AfterSave]),
            Ok(false) => Ok(()),
            Err(err) => {
                self.restore(saved);
                Err(err)
            }
        }
    }

    /// Returns whether a statement was issued.
    fn write_update(&mut self) -> Result<bool, ModelError> {
        let model = self.model.clone();
        model.run_hook(HookSlot::BeforeValidation, self)?;
        model.validate(self)?;
        model.run_hook(HookSlot::AfterValidation, self)?;
        model.run_hook(HookSlot::BeforeUpdate, self)?;
        model.run_hook(HookSlot::BeforeSave, self)?;

        // Hooks may have reverted every change.
        if !self.is_dirty() {
            return Ok(false);
        }
        self.touch(UPDATED_AT, &timestamp());

        let dirty: Vec<&str> = self.dirty.iter().map(String::as_str).collect();
        let changes = self.format(FormatTarget::Database, &dirty);

        let table = model.table();
        let mut stmt = table.update();
        for (column, value) in &changes {
            stmt.value(Alias::new(column.as_str()), Expr::val(json_to_value(value)));
        }
        stmt.and_where(self.primary_key_condition()?);
        table.run(stmt)?;

        self.rebase();
        Ok(true)
    }

    fn restore(&mut self, saved: Attributes) {
        self.attributes = saved;
        self.dirty.clear();
    }

    /// Delete this record's row.
    ///
    /// Runs beforeDestroy, deletes by primary key, then runs afterDestroy.
    /// The in-memory record stays usable and should be discarded.
    pub fn destroy(&mut self) -> Result<(), ModelError> {
        let model = self.model.clone();
        model.run_hook(HookSlot::BeforeDestroy, self)?;

        let table = model.table();
        let mut stmt = table.delete();
        stmt.and_where(self.primary_key_condition()?);
        table.run(stmt)?;

        model.run_hook(HookSlot::AfterDestroy, self)?;
        Ok(())
    }

    fn primary_key_condition(&self) -> Result<Expr, ModelError> {
        let id = self.id().ok_or_else(|| ModelError::MissingPrimaryKey {
            model: self.model.name().to_string(),
        })?;
        let column = self.model.column_name(self.model.primary_key());
        Ok(Expr::col(Alias::new(column)).eq(json_to_value(id)))
    }

    /// Project attributes to storage or document names.
    ///
    /// With a non-empty `only`, just those attributes are projected.
    /// Attributes that were never set are left out.
    pub fn format(&self, target: FormatTarget, only: &[&str]) -> Attributes {
        let mut out = Attributes::new();
        for (name, column) in self.model.def().attributes() {
            if !only.is_empty() && !only.contains(&name) {
                continue;
            }
            let Some(value) = self.attributes.get(name) else {
                continue;
            };
            let key = match target {
                FormatTarget::Database => &column.column_name,
                FormatTarget::JsonApi => &column.doc_name,
            };
            out.insert(key.clone(), value.clone());
        }
        out
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.model.name() == other.model.name()
            && self.initialized == other.initialized
            && self.attributes == other.attributes
            && self.related == other.related
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model.name())
            .field("attributes", &self.attributes)
            .field("initialized", &self.initialized)
            .field("dirty", &self.dirty)
            .field("related", &self.related)
            .finish()
    }
}

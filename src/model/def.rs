//! Static model definitions.

use super::column::Column;
use super::hooks::{HookFn, HookSlot, Hooks};
use super::relation::{RelationType, Relationship};
use super::validation::Validations;
use super::{ModelError, Record};
use convert_case::{Case, Casing};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub const DEFAULT_PRIMARY_KEY: &str = "id";
pub const DEFAULT_PER_PAGE: u64 = 25;

/// Immutable schema of one model.
///
/// ```
/// use lux_model::{HookSlot, ModelDef};
///
/// let def = ModelDef::builder("BlogPost")
///     .attribute("id")
///     .attribute("title")
///     .attribute("authorId")
///     .belongs_to("author", "User", "authorId")
///     .validates("title", "is required", |v| !v.is_null())
///     .hook(HookSlot::BeforeSave, |_record| Ok(()))
///     .build();
///
/// assert_eq!(def.table_name(), "blog_posts");
/// assert_eq!(def.column("authorId").unwrap().column_name, "author_id");
/// ```
#[derive(Debug, Clone)]
pub struct ModelDef {
    name: String,
    table_name: String,
    primary_key: String,
    default_per_page: u64,
    attributes: Vec<(String, Column)>,
    belongs_to: BTreeMap<String, Relationship>,
    has_one: BTreeMap<String, Relationship>,
    has_many: BTreeMap<String, Relationship>,
    hooks: Hooks,
    validations: Validations,
}

impl ModelDef {
    pub fn builder(name: impl Into<String>) -> ModelDefBuilder {
        ModelDefBuilder::new(name.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn default_per_page(&self) -> u64 {
        self.default_per_page
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.attributes.iter().map(|(name, column)| (name.as_str(), column))
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, attribute: &str) -> Option<&Column> {
        self.attributes
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, column)| column)
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn validations(&self) -> &Validations {
        &self.validations
    }

    /// Look up a relationship by name.
    ///
    /// When a name is declared under several kinds, `hasMany` shadows
    /// `hasOne`, which shadows `belongsTo`. See
    /// [`relationship_collisions`](Self::relationship_collisions).
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.has_many
            .get(name)
            .or_else(|| self.has_one.get(name))
            .or_else(|| self.belongs_to.get(name))
    }

    /// Every relationship, one per name, with the shadowing of
    /// [`relationship`](Self::relationship) applied.
    pub fn relationships(&self) -> BTreeMap<&str, &Relationship> {
        let mut merged = BTreeMap::new();
        for map in [&self.belongs_to, &self.has_one, &self.has_many] {
            for (name, rel) in map {
                merged.insert(name.as_str(), rel);
            }
        }
        merged
    }

    pub fn relationship_names(&self) -> Vec<&str> {
        self.relationships().into_keys().collect()
    }

    /// Relationship names declared under more than one kind.
    pub fn relationship_collisions(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut collisions = BTreeSet::new();
        for map in [&self.belongs_to, &self.has_one, &self.has_many] {
            for name in map.keys() {
                if !seen.insert(name) {
                    collisions.insert(name.clone());
                }
            }
        }
        collisions.into_iter().collect()
    }
}

pub struct ModelDefBuilder {
    name: String,
    table_name: Option<String>,
    primary_key: String,
    default_per_page: u64,
    attributes: Vec<(String, Column)>,
    belongs_to: BTreeMap<String, Relationship>,
    has_one: BTreeMap<String, Relationship>,
    has_many: BTreeMap<String, Relationship>,
    hooks: Hooks,
    validations: Validations,
}

impl ModelDefBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            table_name: None,
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            default_per_page: DEFAULT_PER_PAGE,
            attributes: Vec::new(),
            belongs_to: BTreeMap::new(),
            has_one: BTreeMap::new(),
            has_many: BTreeMap::new(),
            hooks: Hooks::new(),
            validations: Validations::default(),
        }
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn default_per_page(mut self, per_page: u64) -> Self {
        self.default_per_page = per_page;
        self
    }

    /// Declare an attribute with default column and document names.
    pub fn attribute(self, name: &str) -> Self {
        let column = Column::for_attribute(name);
        self.attribute_with(name, column)
    }

    /// Declare an attribute with explicit names. Redeclaring replaces the
    /// column but keeps the original position.
    pub fn attribute_with(mut self, name: &str, column: Column) -> Self {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = column,
            None => self.attributes.push((name.to_string(), column)),
        }
        self
    }

    pub fn belongs_to(self, name: &str, target_model: &str, foreign_key: &str) -> Self {
        self.relationship(RelationType::BelongsTo, name, target_model, foreign_key)
    }

    pub fn has_one(self, name: &str, target_model: &str, foreign_key: &str) -> Self {
        self.relationship(RelationType::HasOne, name, target_model, foreign_key)
    }

    pub fn has_many(self, name: &str, target_model: &str, foreign_key: &str) -> Self {
        self.relationship(RelationType::HasMany, name, target_model, foreign_key)
    }

    fn relationship(mut self, kind: RelationType, name: &str, target_model: &str, foreign_key: &str) -> Self {
        let rel = Relationship {
            name: name.to_string(),
            kind,
            target_model: target_model.to_string(),
            foreign_key: foreign_key.to_string(),
        };
        let map = match kind {
            RelationType::BelongsTo => &mut self.belongs_to,
            RelationType::HasOne => &mut self.has_one,
            RelationType::HasMany => &mut self.has_many,
        };
        map.insert(name.to_string(), rel);
        self
    }

    pub fn hook<F>(mut self, slot: HookSlot, hook: F) -> Self
    where
        F: Fn(&mut Record) -> Result<(), ModelError> + Send + Sync + 'static,
    {
        let hook: HookFn = Arc::new(hook);
        self.hooks.push(slot, hook);
        self
    }

    pub fn validates<F>(mut self, attribute: &str, message: &str, predicate: F) -> Self
    where
        F: Fn(&JsonValue) -> bool + Send + Sync + 'static,
    {
        self.validations.push(attribute, message, Arc::new(predicate));
        self
    }

    pub fn build(self) -> ModelDef {
        let table_name = self
            .table_name
            .unwrap_or_else(|| pluralize(&self.name.to_case(Case::Snake)));
        ModelDef {
            name: self.name,
            table_name,
            primary_key: self.primary_key,
            default_per_page: self.default_per_page,
            attributes: self.attributes,
            belongs_to: self.belongs_to,
            has_one: self.has_one,
            has_many: self.has_many,
            hooks: self.hooks,
            validations: self.validations,
        }
    }
}

/// English plural of the last word of a snake_case name.
fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if word.ends_with(['s', 'x', 'z']) || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{word}es");
    }
    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let def = ModelDef::builder("Post").attribute("id").build();
        assert_eq!(def.table_name(), "posts");
        assert_eq!(def.primary_key(), "id");
        assert_eq!(def.default_per_page(), 25);
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("blog_post"), "blog_posts");
        assert_eq!(pluralize("match"), "matches");
    }

    #[test]
    fn test_attributes_keep_declaration_order() {
        let def = ModelDef::builder("Post")
            .attribute("title")
            .attribute("id")
            .attribute_with("body", Column::new("content", "text"))
            .attribute("title")
            .build();
        assert_eq!(def.attribute_names(), vec!["title", "id", "body"]);
        assert_eq!(def.column("body").unwrap().column_name, "content");
    }

    #[test]
    fn test_disjoint_relationships_have_no_collisions() {
        let def = ModelDef::builder("Post")
            .belongs_to("author", "User", "authorId")
            .has_many("comments", "Comment", "postId")
            .build();
        assert!(def.relationship_collisions().is_empty());
        assert_eq!(def.relationship_names(), vec!["author", "comments"]);
    }

    #[test]
    fn test_colliding_names_are_reported_and_has_many_shadows() {
        let def = ModelDef::builder("Post")
            .belongs_to("image", "Image", "imageId")
            .has_one("image", "Image", "postId")
            .has_many("image", "Image", "postId")
            .build();
        assert_eq!(def.relationship_collisions(), vec!["image".to_string()]);
        assert_eq!(def.relationship("image").unwrap().kind, RelationType::HasMany);
        assert_eq!(def.relationships().len(), 1);
    }

    #[test]
    fn test_has_one_shadows_belongs_to() {
        let def = ModelDef::builder("User")
            .belongs_to("profile", "Profile", "profileId")
            .has_one("profile", "Profile", "userId")
            .build();
        assert_eq!(def.relationship("profile").unwrap().kind, RelationType::HasOne);
    }
}

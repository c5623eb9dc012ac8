//! Connection ownership, the boot-time migration gate and the model registry.

use crate::cache::{Cache, CacheError};
use crate::config::DatabaseConfig;
use crate::connection::{connect, ping, ConnectionError};
use crate::executor::LifeExecutor;
use crate::migration::{
    check_migrations, MigrationError, MigrationRegistry, Migrator, SchemaManager,
};
use crate::model::{Model, ModelDef, RelationType, ResolvedRelationship};
use crate::table::TableAccessor;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug)]
pub enum DatabaseError {
    /// No model is registered under this name.
    ModelMissing(String),
    Migration(MigrationError),
    Cache(CacheError),
    Connection(ConnectionError),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::ModelMissing(name) => {
                write!(f, "Could not resolve model by name '{name}'")
            }
            DatabaseError::Migration(e) => write!(f, "{e}"),
            DatabaseError::Cache(e) => write!(f, "{e}"),
            DatabaseError::Connection(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatabaseError::ModelMissing(_) => None,
            DatabaseError::Migration(e) => Some(e),
            DatabaseError::Cache(e) => Some(e),
            DatabaseError::Connection(e) => Some(e),
        }
    }
}

impl From<MigrationError> for DatabaseError {
    fn from(err: MigrationError) -> Self {
        DatabaseError::Migration(err)
    }
}

impl From<CacheError> for DatabaseError {
    fn from(err: CacheError) -> Self {
        DatabaseError::Cache(err)
    }
}

impl From<ConnectionError> for DatabaseError {
    fn from(err: ConnectionError) -> Self {
        DatabaseError::Connection(err)
    }
}

/// One connection, one cache and every defined model.
pub struct Database {
    config: DatabaseConfig,
    executor: Arc<dyn LifeExecutor>,
    cache: Arc<Cache>,
    models: RwLock<BTreeMap<String, Model>>,
    migrations_checked: AtomicBool,
}

impl Database {
    /// Wrap an existing executor.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Cache` if the configured cache store is not
    /// supported.
    pub fn new(config: DatabaseConfig, executor: Arc<dyn LifeExecutor>) -> Result<Self, DatabaseError> {
        let cache = Arc::new(Cache::new(&config.cache)?);
        Ok(Self {
            config,
            executor,
            cache,
            models: RwLock::new(BTreeMap::new()),
            migrations_checked: AtomicBool::new(false),
        })
    }

    /// Connect to `config.url` with `may_postgres`.
    pub fn connect(config: DatabaseConfig) -> Result<Self, DatabaseError> {
        let executor = connect(&config)?;
        Self::new(config, Arc::new(executor))
    }

    /// Check that the connection still answers.
    pub fn ping(&self) -> Result<(), DatabaseError> {
        Ok(ping(self.executor.as_ref())?)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Whether this process runs the migration gate.
    pub fn is_leader(&self) -> bool {
        self.config.is_leader()
    }

    pub fn executor(&self) -> &Arc<dyn LifeExecutor> {
        &self.executor
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn schema(&self) -> SchemaManager<'_> {
        SchemaManager::new(self.executor.as_ref())
    }

    pub fn migrator(&self) -> Migrator {
        Migrator::new(&self.config.migrations_path)
    }

    /// Apply every pending migration.
    pub fn migrate(&self, registry: &MigrationRegistry) -> Result<Vec<String>, DatabaseError> {
        Ok(self.migrator().up(self.executor.as_ref(), registry)?)
    }

    /// Roll back the most recently applied migration.
    pub fn rollback(&self, registry: &MigrationRegistry) -> Result<Option<String>, DatabaseError> {
        Ok(self.migrator().down(self.executor.as_ref(), registry)?)
    }

    /// Register model definitions and bind them to their tables.
    ///
    /// The first call on the leader process checks that no migrations are
    /// pending. Relationship targets may be defined in the same call or an
    /// earlier one.
    ///
    /// # Returns
    ///
    /// The models in the order of `defs`.
    ///
    /// # Errors
    ///
    /// `DatabaseError::Migration` when migrations are pending and
    /// `DatabaseError::ModelMissing` when a relationship targets an unknown
    /// model. Both are meant to stop the application from booting.
    pub fn define(&self, defs: Vec<ModelDef>) -> Result<Vec<Model>, DatabaseError> {
        if self.is_leader() && !self.migrations_checked.load(Ordering::Acquire) {
            check_migrations(self.executor.as_ref(), &self.config.migrations_path)?;
            self.migrations_checked.store(true, Ordering::Release);
        }

        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());

        let mut known: BTreeMap<&str, &ModelDef> =
            models.iter().map(|(name, model)| (name.as_str(), model.def())).collect();
        for def in &defs {
            known.insert(def.name(), def);
        }

        let mut defined = Vec::with_capacity(defs.len());
        for def in &defs {
            for name in def.relationship_collisions() {
                log::warn!(
                    "{}.{name} is declared as more than one relationship kind",
                    def.name()
                );
            }

            let relationships = resolve_relationships(def, &known).map_err(|err| {
                log::error!("{err}");
                err
            })?;
            let table = TableAccessor::new(def.table_name(), self.executor.clone(), self.config.debug);
            defined.push(Model::new(def.clone(), table, self.cache.clone(), relationships));
        }

        for model in &defined {
            models.insert(model.name().to_string(), model.clone());
        }
        log::info!("Defined {} model(s)", defined.len());

        Ok(defined)
    }

    /// Look up a defined model by name.
    pub fn model_for(&self, name: &str) -> Result<Model, DatabaseError> {
        let models = self.models.read().unwrap_or_else(|e| e.into_inner());
        models
            .get(name)
            .cloned()
            .ok_or_else(|| DatabaseError::ModelMissing(name.to_string()))
    }

    pub fn model_names(&self) -> Vec<String> {
        let models = self.models.read().unwrap_or_else(|e| e.into_inner());
        models.keys().cloned().collect()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("models", &self.model_names())
            .finish_non_exhaustive()
    }
}

fn resolve_relationships(
    def: &ModelDef,
    known: &BTreeMap<&str, &ModelDef>,
) -> Result<BTreeMap<String, ResolvedRelationship>, DatabaseError> {
    let mut resolved = BTreeMap::new();

    for (name, rel) in def.relationships() {
        let target = known
            .get(rel.target_model.as_str())
            .copied()
            .ok_or_else(|| DatabaseError::ModelMissing(rel.target_model.clone()))?;

        // belongsTo keeps the foreign key on this side, the others on the target.
        let fk_owner = match rel.kind {
            RelationType::BelongsTo => def,
            RelationType::HasOne | RelationType::HasMany => target,
        };
        let column_of = |owner: &ModelDef, attribute: &str| {
            owner
                .column(attribute)
                .map_or_else(|| attribute.to_string(), |c| c.column_name.clone())
        };

        resolved.insert(
            name.to_string(),
            ResolvedRelationship {
                name: name.to_string(),
                kind: rel.kind,
                target_model: rel.target_model.clone(),
                target_table: target.table_name().to_string(),
                target_primary_key: target.primary_key().to_string(),
                target_primary_key_column: column_of(target, target.primary_key()),
                foreign_key_column: column_of(fk_owner, &rel.foreign_key),
                target_attributes: target
                    .attributes()
                    .map(|(attr, column)| (attr.to_string(), column.column_name.clone()))
                    .collect(),
            },
        );
    }

    Ok(resolved)
}

//! Migrations available to the runner, by version

use crate::migration::{Migration, MigrationError, SchemaManager};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Direction to run a migration in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    Up,
    Down,
}

/// Registered migrations, keyed by version.
#[derive(Clone, Default)]
pub struct MigrationRegistry {
    migrations: BTreeMap<String, Arc<dyn Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if another migration uses
    /// the same version.
    pub fn register(&mut self, migration: impl Migration + 'static) -> Result<(), MigrationError> {
        let version = migration.version().to_string();
        if self.migrations.contains_key(&version) {
            return Err(MigrationError::AlreadyRegistered {
                version,
                name: migration.name().to_string(),
            });
        }
        self.migrations.insert(version, Arc::new(migration));
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, migration: impl Migration + 'static) -> Result<Self, MigrationError> {
        self.register(migration)?;
        Ok(self)
    }

    pub fn get(&self, version: &str) -> Option<Arc<dyn Migration>> {
        self.migrations.get(version).cloned()
    }

    pub fn is_registered(&self, version: &str) -> bool {
        self.migrations.contains_key(version)
    }

    /// Registered versions, ascending.
    pub fn versions(&self) -> Vec<&str> {
        self.migrations.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Run one registered migration.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::NotRegistered` for an unknown version and
    /// `MigrationError::ExecutionFailed` if the migration itself fails.
    pub fn execute(
        &self,
        version: &str,
        manager: &SchemaManager<'_>,
        direction: MigrationDirection,
    ) -> Result<(), MigrationError> {
        let migration = self
            .get(version)
            .ok_or_else(|| MigrationError::NotRegistered {
                version: version.to_string(),
            })?;

        let result = match direction {
            MigrationDirection::Up => migration.up(manager),
            MigrationDirection::Down => migration.down(manager),
        };
        result.map_err(|e| MigrationError::ExecutionFailed {
            version: version.to_string(),
            name: migration.name().to_string(),
            error: e.to_string(),
        })
    }
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("versions", &self.versions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use crate::LifeError;

    struct TestMigration {
        version: &'static str,
        name: &'static str,
        fail: bool,
    }

    impl Migration for TestMigration {
        fn version(&self) -> &str {
            self.version
        }

        fn name(&self) -> &str {
            self.name
        }

        fn up(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
            if self.fail {
                return Err(LifeError::Other("boom".to_string()));
            }
            manager.execute_raw("CREATE TABLE up_ran (id INT)")
        }

        fn down(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
            manager.execute_raw("DROP TABLE up_ran")
        }
    }

    fn migration(version: &'static str) -> TestMigration {
        TestMigration {
            version,
            name: "test",
            fail: false,
        }
    }

    #[test]
    fn test_duplicate_version_is_rejected() {
        let mut registry = MigrationRegistry::new();
        registry.register(migration("2016030700000000")).unwrap();
        let err = registry.register(migration("2016030700000000")).unwrap_err();
        assert!(matches!(err, MigrationError::AlreadyRegistered { version, .. } if version == "2016030700000000"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_versions_are_sorted() {
        let registry = MigrationRegistry::new()
            .with(migration("2016030900000000"))
            .unwrap()
            .with(migration("2016030700000000"))
            .unwrap();
        assert_eq!(registry.versions(), vec!["2016030700000000", "2016030900000000"]);
    }

    #[test]
    fn test_execute_runs_the_requested_direction() {
        let mock = MockExecutor::new();
        let manager = SchemaManager::new(&mock);
        let registry = MigrationRegistry::new().with(migration("2016030700000000")).unwrap();

        registry
            .execute("2016030700000000", &manager, MigrationDirection::Down)
            .unwrap();
        assert_eq!(mock.sql(), vec!["DROP TABLE up_ran"]);
    }

    #[test]
    fn test_execute_unknown_or_failing_migration() {
        let mock = MockExecutor::new();
        let manager = SchemaManager::new(&mock);
        let registry = MigrationRegistry::new()
            .with(TestMigration {
                version: "2016030700000000",
                name: "broken",
                fail: true,
            })
            .unwrap();

        assert!(matches!(
            registry.execute("2016030800000000", &manager, MigrationDirection::Up),
            Err(MigrationError::NotRegistered { .. })
        ));
        assert!(matches!(
            registry.execute("2016030700000000", &manager, MigrationDirection::Up),
            Err(MigrationError::ExecutionFailed { name, .. }) if name == "broken"
        ));
    }
}

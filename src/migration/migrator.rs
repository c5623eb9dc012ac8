//! Migrator - ledger comparison and migration execution

use crate::migration::file::discover_migrations;
use crate::migration::registry::MigrationDirection;
use crate::migration::state_table;
use crate::migration::{
    MigrationError, MigrationFile, MigrationRegistry, MigrationStatus, SchemaManager,
};
use crate::LifeExecutor;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Compares the migrations directory with the ledger and applies or rolls
/// back registered migrations.
#[derive(Debug, Clone)]
pub struct Migrator {
    migrations_dir: PathBuf,
}

impl Migrator {
    pub fn new(migrations_dir: impl AsRef<Path>) -> Self {
        Self {
            migrations_dir: migrations_dir.as_ref().to_path_buf(),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Migration files on disk, sorted by version.
    pub fn discover(&self) -> Result<Vec<MigrationFile>, MigrationError> {
        discover_migrations(&self.migrations_dir)
    }

    /// Ledger versions, creating the ledger first if needed.
    pub fn applied_versions(&self, executor: &dyn LifeExecutor) -> Result<Vec<String>, MigrationError> {
        state_table::initialize_state_table(executor)?;
        Ok(state_table::applied_versions(executor)?)
    }

    /// Applied versions and pending files.
    pub fn status(&self, executor: &dyn LifeExecutor) -> Result<MigrationStatus, MigrationError> {
        let applied = self.applied_versions(executor)?;
        let files = self.discover()?;

        let known: HashSet<&str> = applied.iter().map(String::as_str).collect();
        let pending = files
            .into_iter()
            .filter(|file| !known.contains(file.version.as_str()))
            .collect();

        Ok(MigrationStatus::new(applied, pending))
    }

    /// Versions on disk that the ledger does not list, in on-disk order.
    pub fn pending(&self, executor: &dyn LifeExecutor) -> Result<Vec<String>, MigrationError> {
        Ok(self.status(executor)?.pending_versions())
    }

    /// Apply every pending migration in order, recording each in the ledger
    /// as it completes.
    ///
    /// Stops at the first failure; migrations applied before it stay
    /// recorded.
    ///
    /// # Returns
    ///
    /// The versions applied by this call.
    pub fn up(
        &self,
        executor: &dyn LifeExecutor,
        registry: &MigrationRegistry,
    ) -> Result<Vec<String>, MigrationError> {
        let status = self.status(executor)?;
        if status.is_up_to_date() {
            return Ok(Vec::new());
        }

        let manager = SchemaManager::new(executor);
        let mut applied = Vec::with_capacity(status.pending.len());

        for file in &status.pending {
            let start = Instant::now();
            registry.execute(&file.version, &manager, MigrationDirection::Up)?;
            state_table::record_version(executor, &file.version)?;

            log::info!(
                "Migrated {}-{} in {}ms",
                file.version,
                file.name,
                start.elapsed().as_millis()
            );
            applied.push(file.version.clone());
        }

        Ok(applied)
    }

    /// Roll back the most recent ledger version.
    ///
    /// # Returns
    ///
    /// The version rolled back, or `None` if the ledger is empty.
    pub fn down(
        &self,
        executor: &dyn LifeExecutor,
        registry: &MigrationRegistry,
    ) -> Result<Option<String>, MigrationError> {
        let applied = self.applied_versions(executor)?;
        let Some(version) = applied.into_iter().max() else {
            return Ok(None);
        };

        let manager = SchemaManager::new(executor);
        registry.execute(&version, &manager, MigrationDirection::Down)?;
        state_table::remove_version(executor, &version)?;

        log::info!("Rolled back {}", version);
        Ok(Some(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::Migration;
    use crate::mock::{row, MockExecutor};
    use crate::LifeError;
    use serde_json::json;
    use std::fs;

    struct Noop(&'static str);

    impl Migration for Noop {
        fn version(&self) -> &str {
            self.0
        }

        fn name(&self) -> &str {
            "noop"
        }

        fn up(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
            manager.execute_raw(&format!("-- up {}", self.0))
        }

        fn down(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
            manager.execute_raw(&format!("-- down {}", self.0))
        }
    }

    fn migrations_dir(versions: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for version in versions {
            fs::write(dir.path().join(format!("{version}-step.sql")), "").unwrap();
        }
        dir
    }

    fn ledger(mock: &MockExecutor, versions: &[&str]) {
        mock.respond_to(
            r#"SELECT "version" FROM "migrations""#,
            versions.iter().map(|v| row([("version", json!(v))])).collect(),
        );
    }

    #[test]
    fn test_pending_preserves_disk_order() {
        let dir = migrations_dir(&["2016030700000000", "2016030800000000", "2016030900000000"]);
        let mock = MockExecutor::new();
        ledger(&mock, &["2016030700000000"]);

        let pending = Migrator::new(dir.path()).pending(&mock).unwrap();
        assert_eq!(pending, vec!["2016030800000000", "2016030900000000"]);
        assert!(mock.sql()[0].starts_with("CREATE TABLE IF NOT EXISTS"));
    }

    #[test]
    fn test_status_counts() {
        let dir = migrations_dir(&["2016030700000000", "2016030800000000"]);
        let mock = MockExecutor::new();
        ledger(&mock, &["2016030700000000"]);

        let status = Migrator::new(dir.path()).status(&mock).unwrap();
        assert!(!status.is_up_to_date());
        assert_eq!(status.latest_applied_version(), Some("2016030700000000"));
        assert_eq!(status.next_pending_version(), Some("2016030800000000"));
    }

    #[test]
    fn test_up_applies_and_records_in_order() {
        let dir = migrations_dir(&["2016030700000000", "2016030800000000"]);
        let mock = MockExecutor::new();
        let registry = MigrationRegistry::new()
            .with(Noop("2016030700000000"))
            .unwrap()
            .with(Noop("2016030800000000"))
            .unwrap();

        let applied = Migrator::new(dir.path()).up(&mock, &registry).unwrap();
        assert_eq!(applied, vec!["2016030700000000", "2016030800000000"]);

        let ran: Vec<String> = mock
            .sql()
            .into_iter()
            .filter(|sql| sql.starts_with("--") || sql.starts_with("INSERT"))
            .collect();
        assert_eq!(
            ran,
            vec![
                "-- up 2016030700000000",
                r#"INSERT INTO "migrations" ("version") VALUES ($1)"#,
                "-- up 2016030800000000",
                r#"INSERT INTO "migrations" ("version") VALUES ($1)"#,
            ]
        );
    }

    #[test]
    fn test_up_stops_at_unregistered_migration() {
        let dir = migrations_dir(&["2016030700000000"]);
        let mock = MockExecutor::new();
        let err = Migrator::new(dir.path())
            .up(&mock, &MigrationRegistry::new())
            .unwrap_err();
        assert!(matches!(err, MigrationError::NotRegistered { .. }));
        assert!(mock.statements_matching("INSERT").is_empty());
    }

    #[test]
    fn test_down_rolls_back_latest_version() {
        let dir = migrations_dir(&["2016030700000000", "2016030800000000"]);
        let mock = MockExecutor::new();
        ledger(&mock, &["2016030700000000", "2016030800000000"]);
        let registry = MigrationRegistry::new()
            .with(Noop("2016030700000000"))
            .unwrap()
            .with(Noop("2016030800000000"))
            .unwrap();

        let rolled_back = Migrator::new(dir.path()).down(&mock, &registry).unwrap();
        assert_eq!(rolled_back.as_deref(), Some("2016030800000000"));
        assert!(mock.sql().contains(&"-- down 2016030800000000".to_string()));
        let delete = &mock.statements_matching("DELETE")[0];
        assert_eq!(delete.values, vec![json!("2016030800000000")]);
    }

    #[test]
    fn test_down_with_empty_ledger_is_noop() {
        let dir = migrations_dir(&[]);
        let mock = MockExecutor::new();
        let rolled_back = Migrator::new(dir.path())
            .down(&mock, &MigrationRegistry::new())
            .unwrap();
        assert!(rolled_back.is_none());
    }
}

//! Boot-time migration gate and the migrate / rollback runner.

mod common;

use lux_model::migration::{Migration, MigrationRegistry, SchemaManager};
use lux_model::mock::{row, MockExecutor};
use lux_model::{DatabaseError, LifeError, MigrationError};
use serde_json::json;
use std::sync::Arc;

const A: &str = "2016030700000000";
const B: &str = "2016030800000000";
const C: &str = "2016030900000000";

fn ledger(mock: &MockExecutor, versions: &[&str]) {
    mock.respond_to(
        r#"SELECT "version" FROM "migrations""#,
        versions.iter().map(|v| row([("version", json!(v))])).collect(),
    );
}

#[test]
fn test_define_fails_with_every_pending_version_in_disk_order() {
    let dir = tempfile::tempdir().unwrap();
    common::write_migrations(
        dir.path(),
        &[
            "2016030900000000-create-comments.js",
            "2016030700000000-create-posts.js",
            "2016030800000000-create-users.js",
        ],
    );
    let mock = Arc::new(MockExecutor::new());
    ledger(&mock, &[A]);
    let db = common::database(dir.path(), &mock);

    match db.define(common::blog_defs()) {
        Err(DatabaseError::Migration(MigrationError::Pending(pending))) => {
            assert_eq!(pending, vec![B, C]);
        }
        other => panic!("expected pending migrations, got {other:?}"),
    }
    assert!(db.model_names().is_empty());
    assert!(matches!(db.model_for("Post"), Err(DatabaseError::ModelMissing(_))));
}

#[test]
fn test_define_succeeds_when_ledger_is_current() {
    let dir = tempfile::tempdir().unwrap();
    common::write_migrations(dir.path(), &["2016030700000000-create-posts.js"]);
    let mock = Arc::new(MockExecutor::new());
    ledger(&mock, &[A]);
    let db = common::database(dir.path(), &mock);

    let models = db.define(common::blog_defs()).unwrap();
    assert_eq!(models.len(), 4);
    assert!(mock.sql()[0].starts_with(r#"CREATE TABLE IF NOT EXISTS "migrations""#));
}

#[test]
fn test_missing_migrations_directory_stops_boot() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockExecutor::new());
    let db = common::database(&dir.path().join("db/migrate"), &mock);

    assert!(matches!(
        db.define(common::blog_defs()),
        Err(DatabaseError::Migration(MigrationError::FileNotFound(_)))
    ));
}

struct CreateTable {
    version: &'static str,
    table: &'static str,
}

impl Migration for CreateTable {
    fn version(&self) -> &str {
        self.version
    }

    fn name(&self) -> &str {
        self.table
    }

    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
        manager.execute_raw(&format!("CREATE TABLE {} (id SERIAL PRIMARY KEY)", self.table))
    }

    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
        manager.execute_raw(&format!("DROP TABLE {}", self.table))
    }
}

fn registry() -> MigrationRegistry {
    MigrationRegistry::new()
        .with(CreateTable { version: A, table: "posts" })
        .unwrap()
        .with(CreateTable { version: B, table: "users" })
        .unwrap()
}

#[test]
fn test_migrate_then_boot() {
    let dir = tempfile::tempdir().unwrap();
    common::write_migrations(
        dir.path(),
        &["2016030700000000-create-posts.js", "2016030800000000-create-users.js"],
    );
    let mock = Arc::new(MockExecutor::new());
    let db = common::database(dir.path(), &mock);

    let applied = db.migrate(&registry()).unwrap();
    assert_eq!(applied, vec![A, B]);
    assert_eq!(mock.statements_matching("CREATE TABLE posts").len(), 1);
    assert_eq!(mock.statements_matching(r#"INSERT INTO "migrations""#).len(), 2);
}

#[test]
fn test_rollback_reverts_latest() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockExecutor::new());
    ledger(&mock, &[A, B]);
    let db = common::database(dir.path(), &mock);

    assert_eq!(db.rollback(&registry()).unwrap().as_deref(), Some(B));
    assert_eq!(mock.statements_matching("DROP TABLE users").len(), 1);
    assert_eq!(mock.statements_matching("DROP TABLE posts").len(), 0);
}

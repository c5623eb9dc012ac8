//! # lux-model
//!
//! Coroutine-native model layer for PostgreSQL built on SeaQuery and `may_postgres`.
//!
//! The crate is made of five parts, leaf first:
//!
//! - [`cache`] - content-addressable memoization keyed by query snapshots
//! - [`collection`] - the read-only result wrapper produced by queries
//! - [`query`] - the lazy fluent builder that records a snapshot and executes it
//! - [`model`] - active-record style definitions, instances and lifecycle hooks
//! - [`database`] / [`migration`] - connection ownership and the boot-time migration gate
//!
//! Every operation that talks to the database blocks the calling coroutine and
//! returns a `Result`; nothing is retried and nothing is implicitly executed.
//!
//! ```no_run
//! use lux_model::{Database, DatabaseConfig, ModelDef};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect(DatabaseConfig::load()?)?;
//! let models = db.define(vec![
//!     ModelDef::builder("Post")
//!         .attribute("id")
//!         .attribute("title")
//!         .belongs_to("author", "User", "authorId")
//!         .build(),
//!     ModelDef::builder("User").attribute("id").attribute("name").build(),
//! ])?;
//!
//! let post = db.model_for("Post")?;
//! let created = post.create([("title", json!("Hello"))])?;
//! let page = post.all().include(["author"]).page(2).execute()?;
//! # let _ = (models, created, page);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod collection;
pub mod config;
pub mod connection;
pub mod database;
pub mod executor;
#[cfg(any(feature = "metrics", feature = "tracing"))]
pub mod metrics;
pub mod migration;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod query;
pub mod table;
pub mod value;

pub use cache::{Cache, CacheError, CacheStore, CacheValue, MemoryStore};
pub use collection::Collection;
pub use config::{CacheConfig, DatabaseConfig};
pub use connection::{connect, ConnectionError};
pub use database::{Database, DatabaseError};
pub use executor::{LifeError, LifeExecutor, MayPostgresExecutor, Row};
pub use migration::{Migration, MigrationError, MigrationRegistry, Migrator, SchemaManager};
pub use model::{
    Attributes, FormatTarget, HookSlot, Model, ModelDef, ModelError, Record, RelationType,
    ValidationError,
};
pub use query::{Direction, Fetched, IncludeSpec, Operation, Query, Snapshot};
pub use table::{Statement, TableAccessor};

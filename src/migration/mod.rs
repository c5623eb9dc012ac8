//! Migration ledger, boot-time gate and runner
//!
//! Migration files live in one directory, named `{version}-{name}.{ext}`
//! with a 16-digit version. The ledger table `migrations` lists the applied
//! versions. At boot, [`check_migrations`] refuses to continue while any file
//! is missing from the ledger. The [`Migrator`] applies or rolls back
//! migrations registered in a [`MigrationRegistry`].
//!
//! # Example
//!
//! ```rust,no_run
//! use lux_model::migration::{Migration, SchemaManager};
//! use sea_query::{Alias, ColumnDef, Table};
//!
//! pub struct CreatePosts;
//!
//! impl Migration for CreatePosts {
//!     fn version(&self) -> &str {
//!         "2016030700000000"
//!     }
//!
//!     fn name(&self) -> &str {
//!         "create-posts"
//!     }
//!
//!     fn up(&self, manager: &SchemaManager<'_>) -> Result<(), lux_model::LifeError> {
//!         let table = Table::create()
//!             .table(Alias::new("posts"))
//!             .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
//!             .col(ColumnDef::new(Alias::new("title")).string().not_null())
//!             .to_owned();
//!         manager.create_table(table)
//!     }
//!
//!     fn down(&self, manager: &SchemaManager<'_>) -> Result<(), lux_model::LifeError> {
//!         manager.drop_table(Table::drop().table(Alias::new("posts")).to_owned())
//!     }
//! }
//! ```

pub mod error;
pub mod file;
pub mod migration;
pub mod migrator;
pub mod registry;
pub mod schema_manager;
pub mod startup;
pub mod state_table;
pub mod status;

pub use error::MigrationError;
pub use file::{discover_migrations, MigrationFile};
pub use migration::Migration;
pub use migrator::Migrator;
pub use registry::{MigrationDirection, MigrationRegistry};
pub use schema_manager::SchemaManager;
pub use startup::{check_migrations, startup_migrations};
pub use state_table::{initialize_state_table, LEDGER_TABLE};
pub use status::MigrationStatus;

//! Migration trait definition

use super::schema_manager::SchemaManager;
use crate::LifeError;

/// A schema change that can be applied and rolled back.
///
/// The version must match the 16-digit prefix of the migration's file in the
/// migrations directory; that file is what the boot-time gate checks.
pub trait Migration: Send + Sync {
    /// 16-digit version, e.g. `2016030700000000`
    fn version(&self) -> &str;

    fn name(&self) -> &str;

    /// Apply the migration.
    ///
    /// Runs on the calling coroutine; the executor blocks until each
    /// statement completes.
    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError>;

    /// Undo [`up`](Self::up).
    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError>;
}

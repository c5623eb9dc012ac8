//! SchemaManager - Provides methods for schema operations in migrations

use crate::{LifeError, LifeExecutor};
use sea_query::{
    Alias, ColumnDef, IndexCreateStatement, IndexDropStatement, PostgresQueryBuilder, Table,
    TableAlterStatement, TableCreateStatement, TableDropStatement, Values,
};

/// Runs DDL for migrations against a borrowed executor.
///
/// Every statement is logged on the `sql` target before it is issued.
pub struct SchemaManager<'a> {
    executor: &'a dyn LifeExecutor,
}

impl<'a> SchemaManager<'a> {
    pub fn new(executor: &'a dyn LifeExecutor) -> Self {
        Self { executor }
    }

    /// Create a table
    ///
    /// # Example
    /// ```rust,no_run
    /// use lux_model::SchemaManager;
    /// use sea_query::{Alias, ColumnDef, Table};
    ///
    /// # fn demo(manager: &SchemaManager<'_>) -> Result<(), lux_model::LifeError> {
    /// let table = Table::create()
    ///     .table(Alias::new("posts"))
    ///     .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
    ///     .col(ColumnDef::new(Alias::new("title")).string().not_null())
    ///     .to_owned();
    ///
    /// manager.create_table(table)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_table(&self, table: TableCreateStatement) -> Result<(), LifeError> {
        self.execute_raw(&table.build(PostgresQueryBuilder))
    }

    pub fn drop_table(&self, table: TableDropStatement) -> Result<(), LifeError> {
        self.execute_raw(&table.build(PostgresQueryBuilder))
    }

    pub fn alter_table(&self, alter: TableAlterStatement) -> Result<(), LifeError> {
        self.execute_raw(&alter.build(PostgresQueryBuilder))
    }

    pub fn create_index(&self, index: IndexCreateStatement) -> Result<(), LifeError> {
        self.execute_raw(&index.build(PostgresQueryBuilder))
    }

    pub fn drop_index(&self, index: IndexDropStatement) -> Result<(), LifeError> {
        self.execute_raw(&index.build(PostgresQueryBuilder))
    }

    pub fn add_column(&self, table: &str, column: ColumnDef) -> Result<(), LifeError> {
        let alter = Table::alter()
            .table(Alias::new(table))
            .add_column(column)
            .to_owned();
        self.alter_table(alter)
    }

    pub fn drop_column(&self, table: &str, column: &str) -> Result<(), LifeError> {
        let alter = Table::alter()
            .table(Alias::new(table))
            .drop_column(Alias::new(column))
            .to_owned();
        self.alter_table(alter)
    }

    pub fn rename_column(&self, table: &str, old_name: &str, new_name: &str) -> Result<(), LifeError> {
        let alter = Table::alter()
            .table(Alias::new(table))
            .rename_column(Alias::new(old_name), Alias::new(new_name))
            .to_owned();
        self.alter_table(alter)
    }

    /// Execute SQL without parameters
    ///
    /// # Example
    /// ```rust,no_run
    /// # fn demo(manager: &lux_model::SchemaManager<'_>) -> Result<(), lux_model::LifeError> {
    /// manager.execute_raw(r#"CREATE EXTENSION IF NOT EXISTS "uuid-ossp""#)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn execute_raw(&self, sql: &str) -> Result<(), LifeError> {
        log::info!(target: "sql", "{}", sql);
        self.executor.execute(sql, &Values(Vec::new())).map(|_| ())
    }

    pub fn executor(&self) -> &dyn LifeExecutor {
        self.executor
    }
}

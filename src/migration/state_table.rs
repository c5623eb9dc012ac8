//! Migration ledger management
//!
//! The ledger is a single table, `migrations`, holding one row per applied
//! migration version.

use crate::migration::file::VERSION_LEN;
use crate::table::Statement;
use crate::{LifeError, LifeExecutor};
use sea_query::{
    Alias, ColumnDef, ConditionalStatement, Expr, ExprTrait, Order, OrderedStatement,
    PostgresQueryBuilder, Query, Table, TableCreateStatement, Values,
};
use serde_json::Value as JsonValue;

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "migrations";

/// `CREATE TABLE IF NOT EXISTS migrations (version VARCHAR(16) PRIMARY KEY)`
pub fn create_state_table() -> TableCreateStatement {
    Table::create()
        .table(Alias::new(LEDGER_TABLE))
        .if_not_exists()
        .col(
            ColumnDef::new(Alias::new("version"))
                .string_len(VERSION_LEN as u32)
                .not_null()
                .primary_key(),
        )
        .to_owned()
}

/// Create the ledger if it does not exist yet.
pub fn initialize_state_table(executor: &dyn LifeExecutor) -> Result<(), LifeError> {
    let sql = create_state_table().build(PostgresQueryBuilder);
    executor.execute(&sql, &Values(Vec::new()))?;
    Ok(())
}

/// Applied versions, ascending.
pub fn applied_versions(executor: &dyn LifeExecutor) -> Result<Vec<String>, LifeError> {
    let stmt = Query::select()
        .column(Alias::new("version"))
        .from(Alias::new(LEDGER_TABLE))
        .order_by(Alias::new("version"), Order::Asc)
        .to_owned();
    let (sql, values) = Statement::from(stmt).build();

    let rows = executor.query_all(&sql, &values)?;
    rows.iter()
        .map(|row| match row.get("version") {
            Some(JsonValue::String(version)) => Ok(version.clone()),
            Some(JsonValue::Number(version)) => Ok(version.to_string()),
            other => Err(LifeError::ParseError(format!(
                "unexpected ledger version {:?}",
                other
            ))),
        })
        .collect()
}

pub fn record_version(executor: &dyn LifeExecutor, version: &str) -> Result<(), LifeError> {
    let mut stmt = Query::insert();
    stmt.into_table(Alias::new(LEDGER_TABLE))
        .columns([Alias::new("version")]);
    stmt.values([Expr::val(version)])
        .map_err(|e| LifeError::QueryError(e.to_string()))?;
    let (sql, values) = Statement::from(stmt).build();
    executor.execute(&sql, &values)?;
    Ok(())
}

pub fn remove_version(executor: &dyn LifeExecutor, version: &str) -> Result<(), LifeError> {
    let stmt = Query::delete()
        .from_table(Alias::new(LEDGER_TABLE))
        .and_where(Expr::col(Alias::new("version")).eq(version))
        .to_owned();
    let (sql, values) = Statement::from(stmt).build();
    executor.execute(&sql, &values)?;
    Ok(())
}

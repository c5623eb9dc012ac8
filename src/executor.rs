//! `LifeExecutor` Module
//!
//! Provides the `LifeExecutor` trait that abstracts database execution, and the
//! `may_postgres` backed implementation used in production.
//!
//! Statements reach an executor already rendered by SeaQuery as a SQL string plus
//! its bound [`Values`]. Rows come back as [`Row`] maps of column label to JSON
//! value so the model layer never has to know about driver row types.

use crate::value::postgres::{decode_row, with_converted_params};
use may_postgres::{Client, Error as PostgresError};
use sea_query::Values;
use std::fmt;
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// A decoded result row: column label to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// `LifeExecutor` error type
#[derive(Debug)]
pub enum LifeError {
    /// `PostgreSQL` error from `may_postgres`
    PostgresError(PostgresError),
    /// Query execution error
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for LifeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifeError::PostgresError(e) => {
                write!(f, "PostgreSQL error: {e}")
            }
            LifeError::QueryError(s) => {
                write!(f, "Query error: {s}")
            }
            LifeError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            LifeError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for LifeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifeError::PostgresError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PostgresError> for LifeError {
    fn from(err: PostgresError) -> Self {
        LifeError::PostgresError(err)
    }
}

/// Trait for executing database operations
///
/// This trait abstracts database execution, allowing different implementations
/// (direct client, test double, etc.) to be used interchangeably. Implementations
/// are shared between every model bound to a [`Database`](crate::Database), so they
/// must be `Send + Sync`.
///
/// Failures are returned as-is. Nothing above this trait retries.
pub trait LifeExecutor: Send + Sync {
    /// Execute a SQL statement and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the statement execution fails.
    fn execute(&self, sql: &str, values: &Values) -> Result<u64, LifeError>;

    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query execution fails or a row cannot be decoded.
    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Row>, LifeError>;

    /// Execute a query and return the first row, if any
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query execution fails.
    fn query_one(&self, sql: &str, values: &Values) -> Result<Option<Row>, LifeError> {
        Ok(self.query_all(sql, values)?.into_iter().next())
    }
}

/// Implementation of `LifeExecutor` for `may_postgres::Client`
///
/// This is the primary executor implementation that directly uses a `may_postgres::Client`.
/// Calls block the current coroutine until the server answers.
pub struct MayPostgresExecutor {
    client: Client,
}

impl MayPostgresExecutor {
    /// Create a new executor from a `may_postgres::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl LifeExecutor for MayPostgresExecutor {
    fn execute(&self, sql: &str, values: &Values) -> Result<u64, LifeError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let start = Instant::now();
        let result = with_converted_params(values, |params| {
            self.client.execute(sql, params).map_err(LifeError::PostgresError)
        });

        record_outcome(start, result.is_ok());
        result
    }

    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Row>, LifeError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let start = Instant::now();
        let result = with_converted_params(values, |params| {
            let rows = self.client.query(sql, params).map_err(LifeError::PostgresError)?;
            rows.iter().map(decode_row).collect()
        });

        record_outcome(start, result.is_ok());
        result
    }
}

#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
fn record_outcome(start: Instant, ok: bool) {
    let duration = start.elapsed();
    #[cfg(feature = "metrics")]
    {
        METRICS.record_query(duration);
        if !ok {
            METRICS.record_query_error();
        }
    }
    log::trace!("statement finished in {duration:?} (ok: {ok})");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_life_error_display() {
        let err = LifeError::QueryError("test error".to_string());
        assert!(err.to_string().contains("Query error"));
    }

    #[test]
    fn test_life_error_all_variants() {
        let err = LifeError::QueryError("test".to_string());
        assert!(err.to_string().contains("Query error"));

        let err = LifeError::ParseError("test".to_string());
        assert!(err.to_string().contains("Parse error"));

        let err = LifeError::Other("test".to_string());
        assert!(err.to_string().contains("Execution error"));
    }

    #[test]
    fn test_query_one_defaults_to_first_row() {
        struct TwoRows;

        impl LifeExecutor for TwoRows {
            fn execute(&self, _sql: &str, _values: &Values) -> Result<u64, LifeError> {
                Ok(0)
            }

            fn query_all(&self, _sql: &str, _values: &Values) -> Result<Vec<Row>, LifeError> {
                let mut first = Row::new();
                first.insert("n".to_string(), serde_json::json!(1));
                let mut second = Row::new();
                second.insert("n".to_string(), serde_json::json!(2));
                Ok(vec![first, second])
            }
        }

        let row = TwoRows
            .query_one("SELECT n FROM t", &Values(Vec::new()))
            .unwrap()
            .unwrap();
        assert_eq!(row.get("n"), Some(&serde_json::json!(1)));
    }
}

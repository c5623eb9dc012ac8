//! Per-model table binding.
//!
//! A [`TableAccessor`] pairs a table name with the shared executor. It hands
//! out SeaQuery statements already bound to the table and runs them, logging
//! the rendered SQL on the `sql` target when the database is in debug mode.

use crate::executor::{LifeError, LifeExecutor, Row};
use sea_query::{
    Alias, DeleteStatement, InsertStatement, PostgresQueryBuilder, Query, SelectStatement,
    UpdateStatement, Values,
};
use std::fmt;
use std::sync::Arc;

/// A statement ready to be handed to an executor.
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    /// Pre-rendered SQL without parameters, used for DDL.
    Raw(String),
}

impl Statement {
    /// Render to PostgreSQL with `$n` placeholders.
    pub fn build(&self) -> (String, Values) {
        match self {
            Statement::Select(s) => s.build(PostgresQueryBuilder),
            Statement::Insert(s) => s.build(PostgresQueryBuilder),
            Statement::Update(s) => s.build(PostgresQueryBuilder),
            Statement::Delete(s) => s.build(PostgresQueryBuilder),
            Statement::Raw(sql) => (sql.clone(), Values(Vec::new())),
        }
    }

    /// Render to PostgreSQL with values inlined, for logging.
    pub fn to_sql_string(&self) -> String {
        match self {
            Statement::Select(s) => s.to_string(PostgresQueryBuilder),
            Statement::Insert(s) => s.to_string(PostgresQueryBuilder),
            Statement::Update(s) => s.to_string(PostgresQueryBuilder),
            Statement::Delete(s) => s.to_string(PostgresQueryBuilder),
            Statement::Raw(sql) => sql.clone(),
        }
    }
}

impl From<SelectStatement> for Statement {
    fn from(s: SelectStatement) -> Self {
        Statement::Select(s)
    }
}

impl From<InsertStatement> for Statement {
    fn from(s: InsertStatement) -> Self {
        Statement::Insert(s)
    }
}

impl From<UpdateStatement> for Statement {
    fn from(s: UpdateStatement) -> Self {
        Statement::Update(s)
    }
}

impl From<DeleteStatement> for Statement {
    fn from(s: DeleteStatement) -> Self {
        Statement::Delete(s)
    }
}

/// Lazy binding of a table to the shared executor.
///
/// Nothing is issued until [`fetch`](Self::fetch) or [`run`](Self::run).
#[derive(Clone)]
pub struct TableAccessor {
    table: String,
    executor: Arc<dyn LifeExecutor>,
    debug: bool,
}

impl TableAccessor {
    pub fn new(table: impl Into<String>, executor: Arc<dyn LifeExecutor>, debug: bool) -> Self {
        Self {
            table: table.into(),
            executor,
            debug,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn executor(&self) -> &Arc<dyn LifeExecutor> {
        &self.executor
    }

    pub fn select(&self) -> SelectStatement {
        let mut stmt = Query::select();
        stmt.from(Alias::new(self.table.as_str()));
        stmt
    }

    pub fn insert(&self) -> InsertStatement {
        let mut stmt = Query::insert();
        stmt.into_table(Alias::new(self.table.as_str()));
        stmt
    }

    pub fn update(&self) -> UpdateStatement {
        let mut stmt = Query::update();
        stmt.table(Alias::new(self.table.as_str()));
        stmt
    }

    pub fn delete(&self) -> DeleteStatement {
        let mut stmt = Query::delete();
        stmt.from_table(Alias::new(self.table.as_str()));
        stmt
    }

    /// Run a statement that returns rows.
    ///
    /// # Errors
    ///
    /// Returns whatever the executor returns, unmodified.
    pub fn fetch(&self, statement: impl Into<Statement>) -> Result<Vec<Row>, LifeError> {
        let statement = statement.into();
        self.log(&statement);
        let (sql, values) = statement.build();
        self.executor.query_all(&sql, &values)
    }

    /// Run a statement and return the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns whatever the executor returns, unmodified.
    pub fn run(&self, statement: impl Into<Statement>) -> Result<u64, LifeError> {
        let statement = statement.into();
        self.log(&statement);
        let (sql, values) = statement.build();
        self.executor.execute(&sql, &values)
    }

    fn log(&self, statement: &Statement) {
        if self.debug {
            log::info!(target: "sql", "{}", statement.to_sql_string());
        }
    }
}

impl fmt::Debug for TableAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableAccessor")
            .field("table", &self.table)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use sea_query::{Asterisk, ConditionalStatement, Expr, ExprTrait};

    fn accessor(mock: &Arc<MockExecutor>) -> TableAccessor {
        TableAccessor::new("posts", mock.clone(), true)
    }

    #[test]
    fn test_select_is_bound_to_table() {
        let mock = Arc::new(MockExecutor::new());
        let mut stmt = accessor(&mock).select();
        stmt.column(Asterisk);
        assert_eq!(
            Statement::from(stmt).to_sql_string(),
            r#"SELECT * FROM "posts""#
        );
    }

    #[test]
    fn test_run_passes_placeholders_and_values() {
        let mock = Arc::new(MockExecutor::new());
        let table = accessor(&mock);
        let mut stmt = table.delete();
        stmt.and_where(Expr::col(Alias::new("id")).eq(7));
        table.run(stmt).unwrap();

        let captured = mock.statements();
        assert_eq!(captured[0].sql, r#"DELETE FROM "posts" WHERE "id" = $1"#);
        assert_eq!(captured[0].values, vec![serde_json::json!(7)]);
    }

    #[test]
    fn test_raw_statement_has_no_values() {
        let (sql, values) = Statement::Raw("SELECT 1".to_string()).build();
        assert_eq!(sql, "SELECT 1");
        assert!(values.0.is_empty());
    }

    mod capture {
        use log::{Level, LevelFilter, Log, Metadata, Record};
        use std::sync::{Mutex, Once};

        pub struct Capture(Mutex<Vec<(String, Level, String)>>);

        static LOGGER: Capture = Capture(Mutex::new(Vec::new()));
        static INSTALL: Once = Once::new();

        impl Log for Capture {
            fn enabled(&self, _: &Metadata<'_>) -> bool {
                true
            }

            fn log(&self, record: &Record<'_>) {
                self.0.lock().unwrap().push((
                    record.target().to_string(),
                    record.level(),
                    record.args().to_string(),
                ));
            }

            fn flush(&self) {}
        }

        pub fn install() -> &'static Capture {
            INSTALL.call_once(|| {
                let _ = log::set_logger(&LOGGER);
                log::set_max_level(LevelFilter::Trace);
            });
            &LOGGER
        }

        impl Capture {
            /// Messages on `target` that mention `needle`.
            pub fn lines(&self, target: &str, needle: &str) -> Vec<(Level, String)> {
                self.0
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|(t, _, msg)| t == target && msg.contains(needle))
                    .map(|(_, level, msg)| (*level, msg.clone()))
                    .collect()
            }
        }
    }

    fn delete_by_id(table: &TableAccessor, id: i32) {
        let mut stmt = table.delete();
        stmt.and_where(Expr::col(Alias::new("id")).eq(id));
        table.run(stmt).unwrap();
    }

    #[test]
    fn test_debug_mode_logs_rendered_sql() {
        let logs = capture::install();
        let mock = Arc::new(MockExecutor::new());

        let loud = TableAccessor::new("logged_posts", mock.clone(), true);
        delete_by_id(&loud, 7);
        assert_eq!(
            logs.lines("sql", "logged_posts"),
            vec![(
                log::Level::Info,
                r#"DELETE FROM "logged_posts" WHERE "id" = 7"#.to_string()
            )]
        );

        let quiet = TableAccessor::new("quiet_posts", mock.clone(), false);
        delete_by_id(&quiet, 7);
        assert!(logs.lines("sql", "quiet_posts").is_empty());
    }

    #[test]
    fn test_debug_mode_does_not_change_issued_sql() {
        let loud_mock = Arc::new(MockExecutor::new());
        let quiet_mock = Arc::new(MockExecutor::new());
        delete_by_id(&TableAccessor::new("posts", loud_mock.clone(), true), 3);
        delete_by_id(&TableAccessor::new("posts", quiet_mock.clone(), false), 3);

        assert_eq!(loud_mock.statements(), quiet_mock.statements());
    }
}

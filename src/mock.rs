//! In-process executor for tests.
//!
//! [`MockExecutor`] records every statement it is handed and answers reads
//! from canned rows, so model and query behavior can be checked without a
//! PostgreSQL server.

use crate::executor::{LifeError, LifeExecutor, Row};
use crate::value::value_to_json;
use sea_query::Values;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// A statement captured by [`MockExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedStatement {
    pub sql: String,
    pub values: Vec<JsonValue>,
}

#[derive(Default)]
struct MockState {
    statements: Vec<CapturedStatement>,
    queued: VecDeque<Vec<Row>>,
    rules: Vec<(String, Vec<Row>)>,
    failures: VecDeque<String>,
}

/// Executor double that captures SQL and replays queued rows.
///
/// Reads are answered, in order of precedence, by a pending failure
/// ([`fail_next`](Self::fail_next)), the first rule whose needle occurs in the
/// SQL ([`respond_to`](Self::respond_to)), the next queued row set
/// ([`push_rows`](Self::push_rows)), or an empty result.
#[derive(Default)]
pub struct MockExecutor {
    state: Mutex<MockState>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a row set for the next read that no rule answers.
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state().queued.push_back(rows);
        self
    }

    /// Answer every read whose SQL contains `needle` with `rows`.
    pub fn respond_to(&self, needle: impl Into<String>, rows: Vec<Row>) -> &Self {
        self.state().rules.push((needle.into(), rows));
        self
    }

    /// Make the next call, read or write, fail with `LifeError::QueryError`.
    pub fn fail_next(&self, message: impl Into<String>) -> &Self {
        self.state().failures.push_back(message.into());
        self
    }

    /// Every statement seen so far, in order.
    pub fn statements(&self) -> Vec<CapturedStatement> {
        self.state().statements.clone()
    }

    /// SQL of every statement seen so far, in order.
    pub fn sql(&self) -> Vec<String> {
        self.state().statements.iter().map(|s| s.sql.clone()).collect()
    }

    /// Statements whose SQL contains `needle`.
    pub fn statements_matching(&self, needle: &str) -> Vec<CapturedStatement> {
        self.state()
            .statements
            .iter()
            .filter(|s| s.sql.contains(needle))
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.state().statements.len()
    }

    /// Forget captured statements. Queued rows and rules are kept.
    pub fn clear(&self) {
        self.state().statements.clear();
    }

    fn capture(&self, sql: &str, values: &Values) -> Result<(), LifeError> {
        let values = values
            .iter()
            .map(value_to_json)
            .collect::<Result<Vec<_>, _>>()?;
        let mut state = self.state();
        state.statements.push(CapturedStatement {
            sql: sql.to_string(),
            values,
        });
        match state.failures.pop_front() {
            Some(message) => Err(LifeError::QueryError(message)),
            None => Ok(()),
        }
    }
}

impl LifeExecutor for MockExecutor {
    fn execute(&self, sql: &str, values: &Values) -> Result<u64, LifeError> {
        self.capture(sql, values)?;
        Ok(1)
    }

    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Row>, LifeError> {
        self.capture(sql, values)?;
        let mut state = self.state();
        if let Some((_, rows)) = state.rules.iter().find(|(needle, _)| sql.contains(needle.as_str())) {
            return Ok(rows.clone());
        }
        Ok(state.queued.pop_front().unwrap_or_default())
    }
}

/// Build a [`Row`] from `(label, value)` pairs.
pub fn row<K, I>(pairs: I) -> Row
where
    K: Into<String>,
    I: IntoIterator<Item = (K, JsonValue)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::Value;
    use serde_json::json;

    #[test]
    fn test_captures_sql_and_values() {
        let mock = MockExecutor::new();
        mock.execute("DELETE FROM t WHERE id = $1", &Values(vec![Value::from(3i64)]))
            .unwrap();
        let captured = mock.statements();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].values, vec![json!(3)]);
    }

    #[test]
    fn test_rules_take_precedence_over_queue() {
        let mock = MockExecutor::new();
        mock.push_rows(vec![row([("n", json!(1))])]);
        mock.respond_to("COUNT", vec![row([("count", json!(9))])]);

        let counted = mock.query_all("SELECT COUNT(*) FROM t", &Values(vec![])).unwrap();
        assert_eq!(counted[0]["count"], json!(9));

        let queued = mock.query_all("SELECT n FROM t", &Values(vec![])).unwrap();
        assert_eq!(queued[0]["n"], json!(1));

        assert!(mock.query_all("SELECT n FROM t", &Values(vec![])).unwrap().is_empty());
    }

    #[test]
    fn test_fail_next_fails_once() {
        let mock = MockExecutor::new();
        mock.fail_next("boom");
        assert!(mock.execute("SELECT 1", &Values(vec![])).is_err());
        assert!(mock.execute("SELECT 1", &Values(vec![])).is_ok());
        assert_eq!(mock.call_count(), 2);
    }
}

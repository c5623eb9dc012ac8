//! Recorded query operations.
//!
//! A [`Snapshot`] is the ordered list of operations a [`Query`](super::Query)
//! has accumulated. It is both the execution plan and, once hashed, the cache
//! key, so entries are never reordered or merged.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDirectionError(pub String);

impl fmt::Display for ParseDirectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid sort direction {:?}, expected ASC or DESC", self.0)
    }
}

impl std::error::Error for ParseDirectionError {}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(ParseDirectionError(s.to_string()))
        }
    }
}

impl From<Direction> for sea_query::Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => sea_query::Order::Asc,
            Direction::Desc => sea_query::Order::Desc,
        }
    }
}

/// `table.column AS alias`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectColumn {
    pub table: String,
    pub column: String,
    pub alias: String,
}

/// `LEFT JOIN table AS alias ON on.0 = on.1`, both sides `table.column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub table: String,
    pub alias: String,
    pub on: (String, String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Limit(u64),
    Offset(u64),
    OrderBy {
        /// `table.column`
        column: String,
        direction: Direction,
    },
    /// Equality per key; `null` means `IS NULL`.
    Where(BTreeMap<String, JsonValue>),
    WhereIn(BTreeMap<String, Vec<JsonValue>>),
    Select(Vec<SelectColumn>),
    LeftOuterJoin(Join),
    /// Columns of an included relationship, labelled `relation.attribute`.
    SelectRelated {
        relation: String,
        columns: Vec<SelectColumn>,
    },
}

impl Operation {
    /// Name of the table accessor method this operation maps to.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Limit(_) => "limit",
            Operation::Offset(_) => "offset",
            Operation::OrderBy { .. } => "orderBy",
            Operation::Where(_) => "where",
            Operation::WhereIn(_) => "whereIn",
            Operation::Select(_) | Operation::SelectRelated { .. } => "select",
            Operation::LeftOuterJoin(_) => "leftOuterJoin",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Vec<Operation>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, op: Operation) {
        self.0.push(op);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(Operation::name).collect()
    }

    /// Value of the first `limit` entry.
    pub fn limit(&self) -> Option<u64> {
        self.0.iter().find_map(|op| match op {
            Operation::Limit(n) => Some(*n),
            _ => None,
        })
    }

    pub fn has_select(&self) -> bool {
        self.0.iter().any(|op| matches!(op, Operation::Select(_)))
    }
}

impl From<Vec<Operation>> for Snapshot {
    fn from(ops: Vec<Operation>) -> Self {
        Self(ops)
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

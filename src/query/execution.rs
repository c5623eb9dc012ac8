//! Folding a snapshot into SQL and turning rows into records.

use super::snapshot::{Operation, Snapshot};
use crate::collection::{Collection, RelatedBag};
use crate::executor::Row;
use crate::model::{Attributes, Model, Record};
use sea_query::{
    Alias, ConditionalStatement, Expr, ExprTrait, JoinType, OrderedStatement, SelectStatement,
};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of [`Query::execute`](super::Query::execute).
#[derive(Debug, Clone)]
pub enum Fetched {
    Many(Arc<Collection>),
    /// `find` yields the first record or nothing.
    One(Option<Record>),
}

impl Fetched {
    pub fn into_collection(self) -> Option<Arc<Collection>> {
        match self {
            Fetched::Many(collection) => Some(collection),
            Fetched::One(_) => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Fetched::One(record) => record,
            Fetched::Many(collection) => collection.first().cloned(),
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Fetched::Many(_))
    }
}

fn column_expr(qualified: &str) -> Expr {
    match qualified.split_once('.') {
        Some((table, column)) => Expr::col((Alias::new(table), Alias::new(column))),
        None => Expr::col(Alias::new(qualified)),
    }
}

/// Apply every operation, in order, to a SELECT on the model's table.
pub(crate) fn build_select(model: &Model, snapshot: &Snapshot) -> SelectStatement {
    let mut select = model.table().select();

    for op in snapshot {
        match op {
            Operation::Limit(n) => {
                select.limit(*n);
            }
            Operation::Offset(n) => {
                select.offset(*n);
            }
            Operation::OrderBy { column, direction } => {
                select.order_by_expr(column_expr(column), (*direction).into());
            }
            Operation::Where(params) => {
                for (key, value) in params {
                    select.and_where(model.condition(key, value));
                }
            }
            Operation::WhereIn(params) => {
                for (key, values) in params {
                    select.and_where(model.condition(key, &JsonValue::Array(values.clone())));
                }
            }
            Operation::Select(columns) | Operation::SelectRelated { columns, .. } => {
                for c in columns {
                    select.expr_as(
                        Expr::col((Alias::new(c.table.as_str()), Alias::new(c.column.as_str()))),
                        Alias::new(c.alias.as_str()),
                    );
                }
            }
            Operation::LeftOuterJoin(join) => {
                select.join_as(
                    JoinType::LeftJoin,
                    Alias::new(join.table.as_str()),
                    Alias::new(join.alias.as_str()),
                    column_expr(&join.on.0).eq(column_expr(&join.on.1)),
                );
            }
        }
    }

    select
}

/// Wrap fetched rows into a collection.
///
/// Labels of the form `relation.attribute` go to the record's related map.
/// A joined relation whose columns are all null matched nothing and is left
/// out.
pub(crate) fn collect(model: &Model, snapshot: &Snapshot, rows: Vec<Row>) -> Collection {
    let mut bag = RelatedBag::new();
    for op in snapshot {
        if let Operation::SelectRelated { relation, columns } = op {
            bag.entry(relation.clone())
                .or_default()
                .extend(columns.iter().map(|c| c.alias.clone()));
        }
    }

    let records = rows
        .into_iter()
        .map(|row| {
            let mut attributes = Attributes::new();
            let mut related: BTreeMap<String, Attributes> = BTreeMap::new();
            for (label, value) in row {
                match label.split_once('.') {
                    Some((relation, attr)) => {
                        related
                            .entry(relation.to_string())
                            .or_default()
                            .insert(attr.to_string(), value);
                    }
                    None if model.has_attribute(&label) => {
                        attributes.insert(label, value);
                    }
                    None => {}
                }
            }
            related.retain(|_, attrs| attrs.values().any(|v| !v.is_null()));
            Record::persisted(model.clone(), attributes, related)
        })
        .collect();

    Collection::new(model.name(), records, bag)
}

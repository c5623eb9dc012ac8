//! Relationship inclusion through left outer joins.
//!
//! Only `belongsTo` and `hasOne` relationships are joined. `hasMany`
//! relationships would multiply the base rows and are never included here.

use super::snapshot::{Join, Operation, SelectColumn};
use crate::model::{Model, RelationType};
use std::collections::BTreeMap;

/// Relationships to include, optionally with an attribute subset each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeSpec {
    Names(Vec<String>),
    Fields(BTreeMap<String, Vec<String>>),
}

impl IncludeSpec {
    fn entries(self) -> Vec<(String, Vec<String>)> {
        match self {
            IncludeSpec::Names(names) => names.into_iter().map(|n| (n, Vec::new())).collect(),
            IncludeSpec::Fields(fields) => fields.into_iter().collect(),
        }
    }
}

impl From<&str> for IncludeSpec {
    fn from(name: &str) -> Self {
        IncludeSpec::Names(vec![name.to_string()])
    }
}

impl From<&[&str]> for IncludeSpec {
    fn from(names: &[&str]) -> Self {
        IncludeSpec::Names(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for IncludeSpec {
    fn from(names: [&str; N]) -> Self {
        IncludeSpec::from(&names[..])
    }
}

impl From<Vec<&str>> for IncludeSpec {
    fn from(names: Vec<&str>) -> Self {
        IncludeSpec::from(names.as_slice())
    }
}

impl From<Vec<String>> for IncludeSpec {
    fn from(names: Vec<String>) -> Self {
        IncludeSpec::Names(names)
    }
}

impl From<BTreeMap<String, Vec<String>>> for IncludeSpec {
    fn from(fields: BTreeMap<String, Vec<String>>) -> Self {
        IncludeSpec::Fields(fields)
    }
}

/// Translate an include request into join and select operations.
pub(crate) fn include_operations(model: &Model, spec: IncludeSpec) -> Vec<Operation> {
    let table = model.table_name();
    let pk_column = model.column_name(model.primary_key());
    let mut ops = Vec::new();

    for (name, fields) in spec.entries() {
        let Some(rel) = model.relationship(&name) else {
            log::debug!("{} has no relationship {name:?}, not included", model.name());
            continue;
        };

        let on = match rel.kind {
            RelationType::BelongsTo => (
                format!("{name}.{}", rel.target_primary_key_column),
                format!("{table}.{}", rel.foreign_key_column),
            ),
            RelationType::HasOne => (
                format!("{name}.{}", rel.foreign_key_column),
                format!("{table}.{pk_column}"),
            ),
            RelationType::HasMany => {
                log::debug!("{}.{name} is hasMany, not joined", model.name());
                continue;
            }
        };

        let mut attributes = vec![rel.target_primary_key.clone()];
        if fields.is_empty() {
            attributes.extend(rel.target_attributes.iter().map(|(attr, _)| attr.clone()));
        } else {
            attributes.extend(fields);
        }
        let mut columns: Vec<SelectColumn> = Vec::new();
        for attr in attributes {
            let Some(column) = rel.target_column(&attr) else {
                continue;
            };
            let alias = format!("{name}.{attr}");
            if columns.iter().any(|c| c.alias == alias) {
                continue;
            }
            columns.push(SelectColumn {
                table: name.clone(),
                column: column.to_string(),
                alias,
            });
        }

        ops.push(Operation::LeftOuterJoin(Join {
            table: rel.target_table.clone(),
            alias: name.clone(),
            on,
        }));
        ops.push(Operation::SelectRelated {
            relation: name,
            columns,
        });
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_conversions() {
        assert_eq!(IncludeSpec::from("author"), IncludeSpec::Names(vec!["author".into()]));
        assert_eq!(
            IncludeSpec::from(["author", "image"]),
            IncludeSpec::Names(vec!["author".into(), "image".into()])
        );
        let mut fields = BTreeMap::new();
        fields.insert("author".to_string(), vec!["name".to_string()]);
        assert_eq!(
            IncludeSpec::from(fields).entries(),
            vec![("author".to_string(), vec!["name".to_string()])]
        );
    }
}

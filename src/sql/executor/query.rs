use std::collections::HashMap;
use std::ops::Bound;

use crate::{
    error::{Error, Result},
    sql::{
        executor::ResultSet,
        parser::ast::{ColumnRef, Condition, TableRef},
        registry::Registry,
        table::Table,
        types::{Row, RowId, Value},
    },
};

use super::Executor;

/// Table scan executor (single-table SELECT)
pub struct Scan {
    table: TableRef,
    filter: Option<Condition>,
}

impl Scan {
    pub fn new(table: TableRef, filter: Option<Condition>) -> Box<Self> {
        Box::new(Self { table, filter })
    }
}

impl Executor for Scan {
    fn execute(self: Box<Self>, registry: &mut Registry) -> Result<ResultSet> {
        let table = registry.get_table(&self.table.name)?;
        let rows = match &self.filter {
            None => table.all_rows(),
            Some(cond) => {
                let ids = condition_ids(table, self.table.label(), cond)?;
                table.rows_by_ids(&ids)
            }
        };
        Ok(ResultSet::Query {
            columns: table.column_names(),
            rows,
        })
    }
}

/// WHERE-clause dispatch: equality probes the hash-index path, the range
/// operators route to the table's range-query methods. This is the query
/// planner's only access-path decision point.
pub(super) fn condition_ids(table: &Table, label: &str, cond: &Condition) -> Result<Vec<RowId>> {
    let column = resolve_column(table, label, cond.column())?;
    match cond {
        Condition::Equal(_, value) => {
            let predicate: HashMap<String, Value> = [(column, value.clone())].into();
            table.ids_matching(&predicate)
        }
        Condition::GreaterThan(_, bound) => {
            table.ids_in_range(&column, Bound::Excluded(bound), Bound::Unbounded)
        }
        Condition::GreaterOrEqual(_, bound) => {
            table.ids_in_range(&column, Bound::Included(bound), Bound::Unbounded)
        }
        Condition::LessThan(_, bound) => {
            table.ids_in_range(&column, Bound::Unbounded, Bound::Excluded(bound))
        }
        Condition::LessOrEqual(_, bound) => {
            table.ids_in_range(&column, Bound::Unbounded, Bound::Included(bound))
        }
        Condition::Between(_, low, high) => {
            table.ids_in_range(&column, Bound::Included(low), Bound::Included(high))
        }
    }
}

/// Resolves a possibly-qualified column against a single table: the
/// qualifier, when present, must be the table's alias or name
fn resolve_column(table: &Table, label: &str, column: &ColumnRef) -> Result<String> {
    if let Some(qualifier) = &column.table {
        if qualifier != label && *qualifier != table.name {
            return Err(Error::ColumnNotFound(column.to_string()));
        }
    }
    table.require_column(&column.column)?;
    Ok(column.column.clone())
}

/// Projection executor - narrows query output to the requested columns
pub struct Projection {
    source: Box<dyn Executor>,
    columns: Vec<ColumnRef>,
}

impl Projection {
    pub fn new(source: Box<dyn Executor>, columns: Vec<ColumnRef>) -> Box<Self> {
        Box::new(Self { source, columns })
    }
}

impl Executor for Projection {
    fn execute(self: Box<Self>, registry: &mut Registry) -> Result<ResultSet> {
        match self.source.execute(registry)? {
            ResultSet::Query { columns, rows } => {
                // Each requested name resolves to a source field: exact
                // match for qualified names, first-table-then-second for
                // bare names (source columns are already in that order)
                let resolved = self
                    .columns
                    .iter()
                    .map(|c| resolve_projected(c, &columns))
                    .collect::<Result<Vec<_>>>()?;

                let out_columns: Vec<String> =
                    self.columns.iter().map(|c| c.to_string()).collect();
                let out_rows = rows
                    .into_iter()
                    .map(|row| {
                        out_columns
                            .iter()
                            .zip(&resolved)
                            .map(|(name, key)| {
                                // A null-padded join side has no field to
                                // project; it reads as Null
                                (name.clone(), row.get(key).cloned().unwrap_or(Value::Null))
                            })
                            .collect::<Row>()
                    })
                    .collect();

                Ok(ResultSet::Query {
                    columns: out_columns,
                    rows: out_rows,
                })
            }
            _ => Err(Error::Internal("unexpected result set".to_string())),
        }
    }
}

fn resolve_projected(column: &ColumnRef, available: &[String]) -> Result<String> {
    match &column.table {
        Some(table) => {
            let key = format!("{}.{}", table, column.column);
            if available.iter().any(|c| *c == key) {
                Ok(key)
            } else {
                Err(Error::ColumnNotFound(column.to_string()))
            }
        }
        None => {
            if available.iter().any(|c| *c == column.column) {
                return Ok(column.column.clone());
            }
            available
                .iter()
                .find(|c| {
                    c.split_once('.')
                        .is_some_and(|(_, col)| col == column.column)
                })
                .cloned()
                .ok_or_else(|| Error::ColumnNotFound(column.to_string()))
        }
    }
}

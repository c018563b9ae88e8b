use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{ResultSet, query},
        parser::ast::Condition,
        registry::Registry,
        table::Table,
        types::{Row, Value},
    },
};

use super::Executor;

/// INSERT executor
pub struct Insert {
    table_name: String,
    columns: Vec<String>,
    values: Vec<Vec<Value>>,
}

impl Insert {
    pub fn new(table_name: String, columns: Vec<String>, values: Vec<Vec<Value>>) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            values,
        })
    }
}

/// Aligns a VALUES tuple with its column list. Without an explicit list the
/// tuple follows schema order; either way the counts must agree. Columns
/// left out of an explicit list become Nulls inside `Table::insert`, where
/// the null constraint gets to veto them.
fn make_row(table: &Table, columns: &[String], values: Vec<Value>) -> Result<Row> {
    let names = if columns.is_empty() {
        table.column_names()
    } else {
        columns.to_vec()
    };
    if names.len() != values.len() {
        return Err(Error::ColumnValueCountMismatch {
            columns: names.len(),
            values: values.len(),
        });
    }
    Ok(names.into_iter().zip(values).collect())
}

impl Executor for Insert {
    fn execute(self: Box<Self>, registry: &mut Registry) -> Result<ResultSet> {
        let table = registry.get_table_mut(&self.table_name)?;
        let mut count = 0;
        for tuple in self.values {
            let row = make_row(table, &self.columns, tuple)?;
            table.insert(row)?;
            count += 1;
        }
        debug!(table = %self.table_name, count, "insert statement");
        Ok(ResultSet::Insert { count })
    }
}

/// UPDATE executor
pub struct Update {
    table_name: String,
    assignments: Vec<(String, Value)>,
    filter: Condition,
}

impl Update {
    pub fn new(table_name: String, assignments: Vec<(String, Value)>, filter: Condition) -> Box<Self> {
        Box::new(Self {
            table_name,
            assignments,
            filter,
        })
    }
}

impl Executor for Update {
    fn execute(self: Box<Self>, registry: &mut Registry) -> Result<ResultSet> {
        let ids = {
            let table = registry.get_table(&self.table_name)?;
            query::condition_ids(table, &self.table_name, &self.filter)?
        };
        let changes: HashMap<String, Value> = self.assignments.into_iter().collect();
        let table = registry.get_table_mut(&self.table_name)?;
        let count = table.apply_update(&ids, &changes)?;
        Ok(ResultSet::Update { count })
    }
}

/// DELETE executor
pub struct Delete {
    table_name: String,
    filter: Condition,
}

impl Delete {
    pub fn new(table_name: String, filter: Condition) -> Box<Self> {
        Box::new(Self { table_name, filter })
    }
}

impl Executor for Delete {
    fn execute(self: Box<Self>, registry: &mut Registry) -> Result<ResultSet> {
        let ids = {
            let table = registry.get_table(&self.table_name)?;
            query::condition_ids(table, &self.table_name, &self.filter)?
        };
        let table = registry.get_table_mut(&self.table_name)?;
        let count = table.delete_ids(&ids);
        Ok(ResultSet::Delete { count })
    }
}

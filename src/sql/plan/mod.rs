use crate::{
    error::Result,
    sql::{
        executor::{Executor, ResultSet},
        parser::ast::{ColumnRef, Condition, JoinKind, Statement, TableRef},
        registry::Registry,
        schema::Column,
        types::Value,
    },
};

mod planner;

use planner::Planner;

/// Execution plan node
#[derive(Debug, PartialEq)]
pub enum Node {
    CreateTable {
        name: String,
        columns: Vec<Column>,
    },
    DropTable {
        name: String,
    },
    Insert {
        table_name: String,
        columns: Vec<String>,
        values: Vec<Vec<Value>>,
    },
    /// Single-table scan; the filter picks the access path at execution
    /// time (hash probe, range index, or full scan)
    Scan {
        table: TableRef,
        filter: Option<Condition>,
    },
    /// Two-table hash join; the build side is chosen at execution time
    /// from the materialized row counts
    HashJoin {
        left: TableRef,
        right: TableRef,
        kind: JoinKind,
        left_key: ColumnRef,
        right_key: ColumnRef,
        filter: Option<Condition>,
    },
    Projection {
        source: Box<Node>,
        columns: Vec<ColumnRef>,
    },
    Update {
        table_name: String,
        assignments: Vec<(String, Value)>,
        filter: Condition,
    },
    Delete {
        table_name: String,
        filter: Condition,
    },
}

/// Execution plan: a single root node
#[derive(Debug, PartialEq)]
pub struct Plan(pub Node);

impl Plan {
    /// Builds an execution plan from an AST statement
    pub fn build(stmt: Statement) -> Result<Self> {
        Planner::new().build(stmt)
    }

    /// Builds the executor tree and runs it against the registry
    pub fn execute(self, registry: &mut Registry) -> Result<ResultSet> {
        <dyn Executor>::build(self.0).execute(registry)
    }
}

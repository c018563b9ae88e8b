use std::fmt::Display;

use crate::{
    error::Result,
    sql::{
        executor::{
            join::HashJoin,
            mutation::{Delete, Insert, Update},
            query::{Projection, Scan},
            schema::{CreateTable, DropTable},
        },
        plan::Node,
        registry::Registry,
        types::{Row, Value},
    },
};

pub mod join;
mod mutation;
mod query;
mod schema;

/// SQL executor trait
pub trait Executor {
    fn execute(self: Box<Self>, registry: &mut Registry) -> Result<ResultSet>;
}

/// Builds an executor from a plan node
impl dyn Executor {
    pub fn build(node: Node) -> Box<dyn Executor> {
        match node {
            Node::CreateTable { name, columns } => CreateTable::new(name, columns),
            Node::DropTable { name } => DropTable::new(name),
            Node::Insert {
                table_name,
                columns,
                values,
            } => Insert::new(table_name, columns, values),
            Node::Scan { table, filter } => Scan::new(table, filter),
            Node::HashJoin {
                left,
                right,
                kind,
                left_key,
                right_key,
                filter,
            } => HashJoin::new(left, right, kind, left_key, right_key, filter),
            // Recursively build the inner node (Scan or HashJoin)
            Node::Projection { source, columns } => Projection::new(Self::build(*source), columns),
            Node::Update {
                table_name,
                assignments,
                filter,
            } => Update::new(table_name, assignments, filter),
            Node::Delete { table_name, filter } => Delete::new(table_name, filter),
        }
    }
}

/// Execution result set
#[derive(Debug, PartialEq)]
pub enum ResultSet {
    CreateTable { table_name: String },
    DropTable { table_name: String },
    Insert { count: usize },
    Query { columns: Vec<String>, rows: Vec<Row> },
    Update { count: usize },
    Delete { count: usize },
}

impl ResultSet {
    /// Whether this result came from a statement that mutated the registry;
    /// the snapshot store rewrites its file after each of these
    pub fn is_mutation(&self) -> bool {
        !matches!(self, ResultSet::Query { .. })
    }
}

/// Human-readable summary: row listings for queries, row counts for
/// everything else. This is what the REPL/HTTP shims surface verbatim.
impl Display for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSet::CreateTable { table_name } => write!(f, "CREATE TABLE {}", table_name),
            ResultSet::DropTable { table_name } => write!(f, "DROP TABLE {}", table_name),
            ResultSet::Insert { count } => write!(f, "INSERT {}", count),
            ResultSet::Update { count } => write!(f, "UPDATE {}", count),
            ResultSet::Delete { count } => write!(f, "DELETE {}", count),
            ResultSet::Query { columns, rows } => {
                write!(f, "{}", columns.join(" | "))?;
                for row in rows {
                    let line: Vec<String> = columns
                        .iter()
                        .map(|c| row.get(c).unwrap_or(&Value::Null).to_string())
                        .collect();
                    write!(f, "\n{}", line.join(" | "))?;
                }
                Ok(())
            }
        }
    }
}

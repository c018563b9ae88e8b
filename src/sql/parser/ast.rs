use std::fmt::Display;

use crate::sql::types::{DataType, Value};

/// Abstract Syntax Tree (AST) node definitions for SQL statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    /// DROP TABLE statement
    DropTable { name: String },
    /// INSERT statement
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        values: Vec<Vec<Value>>,
    },
    /// SELECT statement, optionally joining a second table
    Select {
        projection: Projection,
        from: TableRef,
        join: Option<JoinClause>,
        filter: Option<Condition>,
    },
    /// UPDATE statement; WHERE is mandatory
    Update {
        table_name: String,
        assignments: Vec<(String, Value)>,
        filter: Condition,
    },
    /// DELETE statement; WHERE is mandatory
    Delete {
        table_name: String,
        filter: Condition,
    },
}

/// Column definition in CREATE TABLE; `nullable` is None when the
/// statement did not say, which the planner resolves to "nullable unless
/// primary key"
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub datatype: DataType,
    pub primary_key: bool,
    pub unique: bool,
    pub nullable: Option<bool>,
}

/// Table reference with optional alias
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// The name rows are namespaced under: the alias if one was given
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

/// JOIN clause: kind, joined table, and the two key columns of the
/// `ON k1 = k2` predicate
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: TableRef,
    pub left_key: ColumnRef,
    pub right_key: ColumnRef,
}

/// Column reference, optionally qualified by table name or alias
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// SELECT projection: `*` or an explicit column list
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Columns(Vec<ColumnRef>),
}

/// A WHERE/ON condition is a single comparison; there is no AND/OR
/// composition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equal(ColumnRef, Value),
    GreaterThan(ColumnRef, Value),
    GreaterOrEqual(ColumnRef, Value),
    LessThan(ColumnRef, Value),
    LessOrEqual(ColumnRef, Value),
    /// Inclusive on both ends
    Between(ColumnRef, Value, Value),
}

impl Condition {
    pub fn column(&self) -> &ColumnRef {
        match self {
            Condition::Equal(col, _)
            | Condition::GreaterThan(col, _)
            | Condition::GreaterOrEqual(col, _)
            | Condition::LessThan(col, _)
            | Condition::LessOrEqual(col, _)
            | Condition::Between(col, _, _) => col,
        }
    }
}

use std::num::ParseFloatError;

use thiserror::Error;

/// Custom Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by the engine
///
/// Every error is synchronous and propagates straight to the caller of
/// `Database::execute`; no operation leaves a table partially mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Statement does not match its expected grammar
    #[error("syntax error: {0}")]
    Syntax(String),
    /// Leading keyword is not a recognized statement
    #[error("unknown statement: {0}")]
    UnknownStatement(String),
    #[error("table {0} does not exist")]
    TableNotFound(String),
    #[error("table {0} already exists")]
    TableAlreadyExists(String),
    /// Column type name is not one of number/string/boolean
    #[error("unsupported type {0}")]
    UnsupportedType(String),
    #[error("column {0} does not exist")]
    ColumnNotFound(String),
    #[error("column/value count mismatch: {columns} columns, {values} values")]
    ColumnValueCountMismatch { columns: usize, values: usize },
    #[error("column {0} cannot be null")]
    NullConstraintViolation(String),
    #[error("type mismatch for column {column}: expected {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },
    #[error("unique constraint violation: column {column} already contains {value}")]
    UniqueConstraintViolation { column: String, value: String },
    /// UPDATE and DELETE refuse to run without a WHERE clause
    #[error("{0} statement requires a WHERE clause")]
    MissingWhereClause(String),
    /// WHERE/ON predicates are single comparisons, no AND/OR composition
    #[error("unsupported WHERE clause: {0}")]
    UnsupportedWhereClause(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// Executor plumbing error; a correct plan never produces one
    #[error("internal error: {0}")]
    Internal(String),
    /// I/O or serialization failure in the snapshot store
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<ParseFloatError> for Error {
    fn from(value: ParseFloatError) -> Self {
        Error::Syntax(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Storage(value.to_string())
    }
}

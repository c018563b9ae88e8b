use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt::Display,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

/// Supported column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Text,
    Number,
    Boolean,
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
        })
    }
}

/// Runtime value stored in a row. Serializes as the plain JSON value
/// (null, string, number, bool) so snapshot files stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    /// Returns the data type of the value, or None if it's Null
    pub fn datatype(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(DataType::Text),
            Self::Number(_) => Some(DataType::Number),
            Self::Boolean(_) => Some(DataType::Boolean),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

// NaN never enters the engine (literals come from parsing digit strings), so
// equality over Number is total in practice.
impl Eq for Value {}

/// Hashing must agree with equality: 0.0 and -0.0 compare equal, so their
/// bit patterns are normalized before hashing.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => state.write_u8(0),
            Value::Text(s) => {
                state.write_u8(1);
                s.hash(state);
            }
            Value::Number(n) => {
                state.write_u8(2);
                let n = if *n == 0.0 { 0.0 } else { *n };
                n.to_bits().hash(state);
            }
            Value::Boolean(b) => {
                state.write_u8(3);
                b.hash(state);
            }
        }
    }
}

/// Ordering for comparisons within one type; mixed types are incomparable.
/// Null sorts below everything (used by diagnostics, never by WHERE ranges).
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (_, _) => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) if *b => write!(f, "TRUE"),
            Value::Boolean(_) => write!(f, "FALSE"),
        }
    }
}

/// A row is an order-irrelevant mapping from column name to value
pub type Row = HashMap<String, Value>;

/// Index into a table's row arena. Slots are never reused, so an id stays
/// valid for the lifetime of its row.
pub type RowId = usize;

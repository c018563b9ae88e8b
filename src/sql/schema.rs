use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::types::{DataType, Value},
};

/// Column schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    /// Whether this column is the primary key (at most one per table)
    pub primary_key: bool,
    pub unique: bool,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            primary_key: false,
            unique: false,
            nullable: true,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// A primary-key or unique column gets a hash index and enforces
    /// at-most-one-row-per-value.
    pub fn is_uniquely_indexed(&self) -> bool {
        self.primary_key || self.unique
    }

    /// The primary key is non-nullable regardless of the nullable flag.
    pub fn allows_null(&self) -> bool {
        self.nullable && !self.primary_key
    }

    /// Checks a single value against this column's type and null constraints
    pub fn validate_value(&self, value: &Value) -> Result<()> {
        match value.datatype() {
            None if self.allows_null() => Ok(()),
            None => Err(Error::NullConstraintViolation(self.name.clone())),
            Some(dt) if dt == self.datatype => Ok(()),
            Some(dt) => Err(Error::TypeMismatch {
                column: self.name.clone(),
                expected: self.datatype.to_string(),
                found: dt.to_string(),
            }),
        }
    }
}

/// Validates a table's column list: non-empty, no duplicate names,
/// at most one primary key.
pub fn validate_columns(table_name: &str, columns: &[Column]) -> Result<()> {
    if columns.is_empty() {
        return Err(Error::InvalidSchema(format!(
            "table {} has no columns",
            table_name
        )));
    }

    for (i, col) in columns.iter().enumerate() {
        if columns[..i].iter().any(|c| c.name == col.name) {
            return Err(Error::InvalidSchema(format!(
                "duplicate column {} in table {}",
                col.name, table_name
            )));
        }
    }

    if columns.iter().filter(|c| c.primary_key).count() > 1 {
        return Err(Error::InvalidSchema(format!(
            "multiple primary keys for table {}",
            table_name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Column, validate_columns};
    use crate::{error::Error, sql::types::{DataType, Value}};

    #[test]
    fn test_validate_columns() {
        let cols = vec![
            Column::new("id", DataType::Number).primary_key(),
            Column::new("name", DataType::Text),
        ];
        assert!(validate_columns("t", &cols).is_ok());

        assert!(matches!(
            validate_columns("t", &[]),
            Err(Error::InvalidSchema(_))
        ));

        let dup = vec![
            Column::new("a", DataType::Number),
            Column::new("a", DataType::Text),
        ];
        assert!(matches!(
            validate_columns("t", &dup),
            Err(Error::InvalidSchema(_))
        ));

        let two_pks = vec![
            Column::new("a", DataType::Number).primary_key(),
            Column::new("b", DataType::Number).primary_key(),
        ];
        assert!(matches!(
            validate_columns("t", &two_pks),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_validate_value() {
        let col = Column::new("age", DataType::Number).not_null();
        assert!(col.validate_value(&Value::Number(3.0)).is_ok());
        assert_eq!(
            col.validate_value(&Value::Null),
            Err(Error::NullConstraintViolation("age".to_string()))
        );
        assert!(matches!(
            col.validate_value(&Value::Text("x".to_string())),
            Err(Error::TypeMismatch { .. })
        ));

        // primary key rejects null even when the nullable flag is set
        let pk = Column::new("id", DataType::Number).primary_key();
        assert!(!pk.allows_null());
    }
}

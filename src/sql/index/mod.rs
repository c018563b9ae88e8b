//! Index structures
//!
//! - `HashIndex`: value -> row-id buckets for O(1) equality probes on
//!   primary-key/unique columns
//! - `RangeIndex`: B-tree over a numeric column for ordered and bounded
//!   queries

use std::collections::HashMap;

use crate::sql::types::{RowId, Value};

pub mod btree;

pub use btree::RangeIndex;

/// Hash index: maps a column value to the ids of the rows holding it.
/// Indices hold row ids only, never rows; the table arena owns the rows.
#[derive(Debug, Default)]
pub struct HashIndex {
    buckets: HashMap<Value, Vec<RowId>>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: Value, row: RowId) {
        self.buckets.entry(value).or_default().push(row);
    }

    /// Removes one row reference; drops the bucket when it empties so
    /// `contains` stays accurate.
    pub fn remove(&mut self, value: &Value, row: RowId) {
        if let Some(bucket) = self.buckets.get_mut(value) {
            bucket.retain(|r| *r != row);
            if bucket.is_empty() {
                self.buckets.remove(value);
            }
        }
    }

    /// Row ids for an exact value, empty if no bucket
    pub fn get(&self, value: &Value) -> &[RowId] {
        self.buckets.get(value).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, value: &Value) -> bool {
        !self.get(value).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::HashIndex;
    use crate::sql::types::Value;

    #[test]
    fn test_hash_index_insert_get_remove() {
        let mut idx = HashIndex::new();
        idx.insert(Value::Number(1.0), 0);
        idx.insert(Value::Number(1.0), 3);
        idx.insert(Value::Text("a".to_string()), 1);

        assert_eq!(idx.get(&Value::Number(1.0)), &[0, 3]);
        assert_eq!(idx.get(&Value::Text("a".to_string())), &[1]);
        assert_eq!(idx.get(&Value::Number(9.0)), &[] as &[usize]);

        idx.remove(&Value::Number(1.0), 0);
        assert_eq!(idx.get(&Value::Number(1.0)), &[3]);
        idx.remove(&Value::Number(1.0), 3);
        assert!(!idx.contains(&Value::Number(1.0)));
    }
}

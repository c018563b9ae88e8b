use std::collections::{HashMap, HashSet};
use std::ops::Bound;

use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        index::{HashIndex, RangeIndex},
        schema::{self, Column},
        types::{DataType, Row, RowId, Value},
    },
};

/// A table owns its rows exclusively; indices hold row ids into the arena,
/// never rows. Every mutation keeps the row store and all indices in step:
/// a row is reachable through every applicable index exactly while it is
/// present in the arena.
///
/// Hash indices are built for every primary-key/unique column, range
/// indices for every Number column. The arena is append-only with
/// tombstones, so row ids stay stable across deletes and arena order is
/// insertion order.
#[derive(Debug)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    rows: Vec<Option<Row>>,
    live: usize,
    hash_indices: HashMap<String, HashIndex>,
    range_indices: HashMap<String, RangeIndex>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        schema::validate_columns(&name, &columns)?;

        let mut hash_indices = HashMap::new();
        let mut range_indices = HashMap::new();
        for col in &columns {
            if col.is_uniquely_indexed() {
                hash_indices.insert(col.name.clone(), HashIndex::new());
            }
            if col.datatype == DataType::Number {
                range_indices.insert(col.name.clone(), RangeIndex::new());
            }
        }

        Ok(Self {
            name,
            columns,
            rows: Vec::new(),
            live: 0,
            hash_indices,
            range_indices,
        })
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.live
    }

    pub fn has_hash_index(&self, column: &str) -> bool {
        self.hash_indices.contains_key(column)
    }

    pub fn has_range_index(&self, column: &str) -> bool {
        self.range_indices.contains_key(column)
    }

    /// Validates and inserts a row. Constraint checks all run before any
    /// state is touched, so a failed insert leaves the table unchanged.
    /// Absent fields become explicit Nulls (subject to the null constraint).
    pub fn insert(&mut self, mut row: Row) -> Result<()> {
        for key in row.keys() {
            if self.column(key).is_none() {
                return Err(Error::ColumnNotFound(key.clone()));
            }
        }

        for col in &self.columns {
            let value = row.entry(col.name.clone()).or_insert(Value::Null);
            col.validate_value(value)?;
        }

        // Uniqueness pre-check via the hash indices; Null is exempt so a
        // nullable unique column may hold any number of Nulls
        for col in &self.columns {
            if !col.is_uniquely_indexed() {
                continue;
            }
            let value = &row[&col.name];
            if !value.is_null()
                && self
                    .hash_indices
                    .get(&col.name)
                    .is_some_and(|idx| idx.contains(value))
            {
                return Err(Error::UniqueConstraintViolation {
                    column: col.name.clone(),
                    value: value.to_string(),
                });
            }
        }

        let id = self.rows.len();
        for col in &self.columns {
            if let Some(index) = self.hash_indices.get_mut(&col.name) {
                index.insert(row[&col.name].clone(), id);
            }
            if let Some(index) = self.range_indices.get_mut(&col.name) {
                if let Value::Number(n) = row[&col.name] {
                    index.insert(n, id);
                }
            }
        }
        self.rows.push(Some(row));
        self.live += 1;
        debug!(table = %self.name, row = id, "inserted row");
        Ok(())
    }

    /// Equality-only selection. With an indexed predicate column, probes
    /// the hash index yielding the fewest candidates and filters the rest;
    /// otherwise falls back to a full scan. An empty predicate returns all
    /// rows in insertion order.
    pub fn select(&self, predicate: &HashMap<String, Value>) -> Result<Vec<Row>> {
        Ok(self.rows_by_ids(&self.ids_matching(predicate)?))
    }

    /// All rows in insertion order
    pub fn all_rows(&self) -> Vec<Row> {
        self.rows.iter().flatten().cloned().collect()
    }

    pub fn select_greater_than(&self, column: &str, bound: &Value) -> Result<Vec<Row>> {
        let ids = self.ids_in_range(column, Bound::Excluded(bound), Bound::Unbounded)?;
        Ok(self.rows_by_ids(&ids))
    }

    pub fn select_greater_or_equal(&self, column: &str, bound: &Value) -> Result<Vec<Row>> {
        let ids = self.ids_in_range(column, Bound::Included(bound), Bound::Unbounded)?;
        Ok(self.rows_by_ids(&ids))
    }

    pub fn select_less_than(&self, column: &str, bound: &Value) -> Result<Vec<Row>> {
        let ids = self.ids_in_range(column, Bound::Unbounded, Bound::Excluded(bound))?;
        Ok(self.rows_by_ids(&ids))
    }

    pub fn select_less_or_equal(&self, column: &str, bound: &Value) -> Result<Vec<Row>> {
        let ids = self.ids_in_range(column, Bound::Unbounded, Bound::Included(bound))?;
        Ok(self.rows_by_ids(&ids))
    }

    /// Inclusive on both ends
    pub fn select_between(&self, column: &str, low: &Value, high: &Value) -> Result<Vec<Row>> {
        let ids = self.ids_in_range(column, Bound::Included(low), Bound::Included(high))?;
        Ok(self.rows_by_ids(&ids))
    }

    /// Updates all rows matching the equality predicate. Assignments are
    /// validated in full before the first row is touched, so a constraint
    /// violation leaves the batch unapplied.
    pub fn update(
        &mut self,
        predicate: &HashMap<String, Value>,
        changes: &HashMap<String, Value>,
    ) -> Result<usize> {
        let ids = self.ids_matching(predicate)?;
        self.apply_update(&ids, changes)
    }

    /// Deletes all rows matching the equality predicate
    pub fn delete(&mut self, predicate: &HashMap<String, Value>) -> Result<usize> {
        let ids = self.ids_matching(predicate)?;
        Ok(self.delete_ids(&ids))
    }

    // --- id-level primitives used by the executor ---

    pub(crate) fn rows_by_ids(&self, ids: &[RowId]) -> Vec<Row> {
        ids.iter()
            .filter_map(|id| self.rows.get(*id).and_then(|slot| slot.clone()))
            .collect()
    }

    pub(crate) fn ids_matching(&self, predicate: &HashMap<String, Value>) -> Result<Vec<RowId>> {
        for key in predicate.keys() {
            self.require_column(key)?;
        }

        // Pick, among indexed predicate columns, the bucket with the
        // fewest candidates; an empty bucket short-circuits
        let probe = predicate
            .iter()
            .filter_map(|(col, value)| {
                self.hash_indices
                    .get(col)
                    .map(|idx| (col.as_str(), idx.get(value)))
            })
            .min_by_key(|(_, bucket)| bucket.len());

        let ids = match probe {
            Some((_, bucket)) if bucket.is_empty() => return Ok(Vec::new()),
            Some((probed, bucket)) => bucket
                .iter()
                .copied()
                .filter(|id| self.matches(*id, predicate, Some(probed)))
                .collect(),
            None => self.live_ids(predicate),
        };
        Ok(ids)
    }

    pub(crate) fn ids_in_range(
        &self,
        column: &str,
        low: Bound<&Value>,
        high: Bound<&Value>,
    ) -> Result<Vec<RowId>> {
        let col = self.require_column(column)?;
        for bound in [&low, &high] {
            if let Bound::Included(v) | Bound::Excluded(v) = bound {
                match v.datatype() {
                    // A Null bound matches nothing
                    None => return Ok(Vec::new()),
                    Some(dt) if dt != col.datatype => {
                        return Err(Error::TypeMismatch {
                            column: col.name.clone(),
                            expected: col.datatype.to_string(),
                            found: dt.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        // Use the range index if one exists; Number columns always have one
        if let Some(index) = self.range_indices.get(column) {
            return Ok(match (low, high) {
                (Bound::Unbounded, Bound::Unbounded) => index.all_sorted(),
                (Bound::Excluded(Value::Number(lo)), Bound::Unbounded) => index.greater_than(*lo),
                (Bound::Included(Value::Number(lo)), Bound::Unbounded) => {
                    index.greater_or_equal(*lo)
                }
                (Bound::Unbounded, Bound::Excluded(Value::Number(hi))) => index.less_than(*hi),
                (Bound::Unbounded, Bound::Included(Value::Number(hi))) => index.less_or_equal(*hi),
                (Bound::Included(Value::Number(lo)), Bound::Included(Value::Number(hi))) => {
                    index.range(*lo, *hi)
                }
                // No statement form produces a half-open two-sided range
                _ => return Err(Error::Internal("unsupported range bounds".to_string())),
            });
        }

        // Linear scan with the equivalent comparison
        let ids = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.as_ref().is_some_and(|row| {
                    let value = row.get(column).unwrap_or(&Value::Null);
                    Self::satisfies_bounds(value, low, high)
                })
            })
            .map(|(id, _)| id)
            .collect();
        Ok(ids)
    }

    pub(crate) fn apply_update(
        &mut self,
        ids: &[RowId],
        changes: &HashMap<String, Value>,
    ) -> Result<usize> {
        // Validate every assignment before touching any row
        for (name, value) in changes {
            let col = self.require_column(name)?;
            col.validate_value(value)?;

            if col.is_uniquely_indexed() && !value.is_null() {
                if ids.len() > 1 {
                    return Err(Error::UniqueConstraintViolation {
                        column: col.name.clone(),
                        value: value.to_string(),
                    });
                }
                let updating: HashSet<RowId> = ids.iter().copied().collect();
                let taken = self
                    .hash_indices
                    .get(name)
                    .is_some_and(|idx| idx.get(value).iter().any(|id| !updating.contains(id)));
                if taken {
                    return Err(Error::UniqueConstraintViolation {
                        column: col.name.clone(),
                        value: value.to_string(),
                    });
                }
            }
        }

        for &id in ids {
            let Some(old) = self.rows.get(id).and_then(|slot| slot.clone()) else {
                continue;
            };

            // Drop the row from every hash index under its pre-update
            // values; range entries are refreshed only for the columns the
            // update touches, so equal-key insertion order survives for the
            // rest
            for col in &self.columns {
                let old_value = old.get(&col.name).unwrap_or(&Value::Null);
                if let Some(index) = self.hash_indices.get_mut(&col.name) {
                    index.remove(old_value, id);
                }
                if changes.contains_key(&col.name) {
                    if let Some(index) = self.range_indices.get_mut(&col.name) {
                        if let Value::Number(n) = old_value {
                            index.delete(*n, id);
                        }
                    }
                }
            }

            if let Some(Some(row)) = self.rows.get_mut(id) {
                for (name, value) in changes {
                    row.insert(name.clone(), value.clone());
                }
            }

            let Some(new) = self.rows.get(id).and_then(|slot| slot.clone()) else {
                continue;
            };
            for col in &self.columns {
                let new_value = new.get(&col.name).unwrap_or(&Value::Null);
                if let Some(index) = self.hash_indices.get_mut(&col.name) {
                    index.insert(new_value.clone(), id);
                }
                if changes.contains_key(&col.name) {
                    if let Some(index) = self.range_indices.get_mut(&col.name) {
                        if let Value::Number(n) = new_value {
                            index.insert(*n, id);
                        }
                    }
                }
            }
        }

        debug!(table = %self.name, count = ids.len(), "updated rows");
        Ok(ids.len())
    }

    /// Removes rows by identity: every index entry goes first, then the
    /// arena slot is tombstoned
    pub(crate) fn delete_ids(&mut self, ids: &[RowId]) -> usize {
        let mut count = 0;
        for &id in ids {
            let Some(row) = self.rows.get_mut(id).and_then(Option::take) else {
                continue;
            };
            for col in &self.columns {
                let value = row.get(&col.name).unwrap_or(&Value::Null);
                if let Some(index) = self.hash_indices.get_mut(&col.name) {
                    index.remove(value, id);
                }
                if let Some(index) = self.range_indices.get_mut(&col.name) {
                    if let Value::Number(n) = value {
                        index.delete(*n, id);
                    }
                }
            }
            self.live -= 1;
            count += 1;
        }
        debug!(table = %self.name, count, "deleted rows");
        count
    }

    // --- helpers ---

    fn live_ids(&self, predicate: &HashMap<String, Value>) -> Vec<RowId> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(id, slot)| {
                slot.is_some() && self.matches(*id, predicate, None)
            })
            .map(|(id, _)| id)
            .collect()
    }

    fn matches(&self, id: RowId, predicate: &HashMap<String, Value>, skip: Option<&str>) -> bool {
        let Some(Some(row)) = self.rows.get(id) else {
            return false;
        };
        predicate
            .iter()
            .filter(|(col, _)| skip != Some(col.as_str()))
            .all(|(col, value)| row.get(col).unwrap_or(&Value::Null) == value)
    }

    fn satisfies_bounds(value: &Value, low: Bound<&Value>, high: Bound<&Value>) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        if value.is_null() {
            return false;
        }
        let above = match low {
            Bound::Unbounded => true,
            Bound::Included(b) => matches!(value.partial_cmp(b), Some(Equal | Greater)),
            Bound::Excluded(b) => matches!(value.partial_cmp(b), Some(Greater)),
        };
        let below = match high {
            Bound::Unbounded => true,
            Bound::Included(b) => matches!(value.partial_cmp(b), Some(Equal | Less)),
            Bound::Excluded(b) => matches!(value.partial_cmp(b), Some(Less)),
        };
        above && below
    }
}

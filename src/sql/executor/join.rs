use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        executor::ResultSet,
        parser::ast::{ColumnRef, Condition, JoinKind, TableRef},
        registry::Registry,
        table::Table,
        types::{Row, Value},
    },
};

use super::Executor;

/// Which relation gets hashed in a hash join
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildSide {
    Left,
    Right,
}

/// Planner rule: the relation with fewer rows is the build side, the other
/// is scanned as the probe side. Hashing the smaller side is what makes the
/// join O(N+M) instead of O(N*M). Ties build the left side.
pub fn build_side(left_rows: usize, right_rows: usize) -> BuildSide {
    if right_rows < left_rows {
        BuildSide::Right
    } else {
        BuildSide::Left
    }
}

/// Hash join executor for two-table SELECTs.
///
/// Output rows namespace every field as `alias.column`; an unmatched side
/// in an outer join contributes a single Null sentinel under its bare alias
/// instead of per-column Nulls.
pub struct HashJoin {
    left: TableRef,
    right: TableRef,
    kind: JoinKind,
    left_key: ColumnRef,
    right_key: ColumnRef,
    filter: Option<Condition>,
}

impl HashJoin {
    pub fn new(
        left: TableRef,
        right: TableRef,
        kind: JoinKind,
        left_key: ColumnRef,
        right_key: ColumnRef,
        filter: Option<Condition>,
    ) -> Box<Self> {
        Box::new(Self {
            left,
            right,
            kind,
            left_key,
            right_key,
            filter,
        })
    }

    /// Does this key reference this table? A qualifier must match the
    /// table's alias or name; a bare key just needs the column to exist.
    fn binds(key: &ColumnRef, table: &Table, table_ref: &TableRef) -> bool {
        let qualifier_ok = match &key.table {
            Some(q) => q == table_ref.label() || *q == table_ref.name,
            None => true,
        };
        qualifier_ok && table.column(&key.column).is_some()
    }
}

impl Executor for HashJoin {
    fn execute(self: Box<Self>, registry: &mut Registry) -> Result<ResultSet> {
        let left_table = registry.get_table(&self.left.name)?;
        let right_table = registry.get_table(&self.right.name)?;

        // Bind each ON key to its table; the two sides may be written in
        // either order
        let (left_col, right_col) = if Self::binds(&self.left_key, left_table, &self.left)
            && Self::binds(&self.right_key, right_table, &self.right)
        {
            (self.left_key.column.clone(), self.right_key.column.clone())
        } else if Self::binds(&self.right_key, left_table, &self.left)
            && Self::binds(&self.left_key, right_table, &self.right)
        {
            (self.right_key.column.clone(), self.left_key.column.clone())
        } else {
            return Err(Error::ColumnNotFound(format!(
                "{} = {}",
                self.left_key, self.right_key
            )));
        };

        // Materialize both sides up front; the join is a pure function of
        // the two row sets from here on
        let left_rows = left_table.all_rows();
        let right_rows = right_table.all_rows();
        let left_label = self.left.label();
        let right_label = self.right.label();

        let side = build_side(left_rows.len(), right_rows.len());
        debug!(
            left = %self.left.name,
            right = %self.right.name,
            build = ?side,
            "hash join"
        );

        let mut joined = match self.kind {
            JoinKind::Inner => match side {
                // Hash the smaller side, scan the larger side once
                BuildSide::Left => {
                    let index = hash_rows(&left_rows, &left_col);
                    let mut out = Vec::new();
                    for probe in &right_rows {
                        for &i in lookup(&index, probe, &right_col) {
                            out.push(join_row(&left_rows[i], left_label, Some(probe), right_label));
                        }
                    }
                    out
                }
                BuildSide::Right => {
                    let index = hash_rows(&right_rows, &right_col);
                    let mut out = Vec::new();
                    for probe in &left_rows {
                        for &i in lookup(&index, probe, &left_col) {
                            out.push(join_row(probe, left_label, Some(&right_rows[i]), right_label));
                        }
                    }
                    out
                }
            },
            // LEFT iterates the first-named table: through the hash map
            // when the second table is the build side, by linear scan of
            // the second table otherwise. Unmatched rows get a null-padded
            // right side.
            JoinKind::Left => {
                let index = (side == BuildSide::Right).then(|| hash_rows(&right_rows, &right_col));
                let mut out = Vec::new();
                for row in &left_rows {
                    let matches: Vec<&Row> = match &index {
                        Some(index) => lookup(index, row, &left_col)
                            .iter()
                            .map(|&i| &right_rows[i])
                            .collect(),
                        None => scan_matches(&right_rows, &right_col, row.get(&left_col)),
                    };
                    if matches.is_empty() {
                        out.push(join_row(row, left_label, None, right_label));
                    } else {
                        for matched in matches {
                            out.push(join_row(row, left_label, Some(matched), right_label));
                        }
                    }
                }
                out
            }
            // RIGHT is symmetric over the second-named table
            JoinKind::Right => {
                let index = (side == BuildSide::Left).then(|| hash_rows(&left_rows, &left_col));
                let mut out = Vec::new();
                for row in &right_rows {
                    let matches: Vec<&Row> = match &index {
                        Some(index) => lookup(index, row, &right_col)
                            .iter()
                            .map(|&i| &left_rows[i])
                            .collect(),
                        None => scan_matches(&left_rows, &left_col, row.get(&right_col)),
                    };
                    if matches.is_empty() {
                        out.push(pad_left_row(row, right_label, left_label));
                    } else {
                        for matched in matches {
                            out.push(join_row(matched, left_label, Some(row), right_label));
                        }
                    }
                }
                out
            }
        };

        if let Some(cond) = &self.filter {
            let Condition::Equal(column, value) = cond else {
                return Err(Error::UnsupportedWhereClause(
                    "joined queries support only an equality filter".to_string(),
                ));
            };
            let key = resolve_join_filter(
                column,
                left_label,
                left_table,
                right_label,
                right_table,
            )?;
            joined.retain(|row| row.get(&key).unwrap_or(&Value::Null) == value);
        }

        let mut columns: Vec<String> = left_table
            .column_names()
            .into_iter()
            .map(|c| format!("{}.{}", left_label, c))
            .collect();
        columns.extend(
            right_table
                .column_names()
                .into_iter()
                .map(|c| format!("{}.{}", right_label, c)),
        );

        Ok(ResultSet::Query {
            columns,
            rows: joined,
        })
    }
}

/// Build phase: hash map from join-key value to row positions. Null keys
/// never join, so they are left out of the map.
fn hash_rows(rows: &[Row], key: &str) -> HashMap<Value, Vec<usize>> {
    let mut index: HashMap<Value, Vec<usize>> = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        match row.get(key) {
            Some(Value::Null) | None => {}
            Some(value) => index.entry(value.clone()).or_default().push(i),
        }
    }
    index
}

/// Probe phase: positions of build-side rows matching this probe row's key
fn lookup<'a>(index: &'a HashMap<Value, Vec<usize>>, probe: &Row, key: &str) -> &'a [usize] {
    match probe.get(key) {
        Some(Value::Null) | None => &[],
        Some(value) => index.get(value).map(Vec::as_slice).unwrap_or(&[]),
    }
}

/// Linear-scan fallback used when the iterated side is also the build side
fn scan_matches<'a>(rows: &'a [Row], key: &str, value: Option<&Value>) -> Vec<&'a Row> {
    match value {
        Some(Value::Null) | None => Vec::new(),
        Some(value) => rows
            .iter()
            .filter(|row| row.get(key) == Some(value))
            .collect(),
    }
}

/// Emits one joined row with fields namespaced by table alias. A missing
/// right side collapses to a single Null sentinel under the bare alias.
fn join_row(left: &Row, left_label: &str, right: Option<&Row>, right_label: &str) -> Row {
    let mut row: Row = left
        .iter()
        .map(|(k, v)| (format!("{}.{}", left_label, k), v.clone()))
        .collect();
    match right {
        Some(right) => {
            for (k, v) in right {
                row.insert(format!("{}.{}", right_label, k), v.clone());
            }
        }
        None => {
            row.insert(right_label.to_string(), Value::Null);
        }
    }
    row
}

/// Null-padded row for an unmatched RIGHT-join row: the first table's side
/// is the sentinel
fn pad_left_row(right: &Row, right_label: &str, left_label: &str) -> Row {
    let mut row: Row = right
        .iter()
        .map(|(k, v)| (format!("{}.{}", right_label, k), v.clone()))
        .collect();
    row.insert(left_label.to_string(), Value::Null);
    row
}

/// A post-join filter column may be alias-qualified or bare; a bare name is
/// matched against the first table's namespace, then the second's
fn resolve_join_filter(
    column: &ColumnRef,
    left_label: &str,
    left_table: &Table,
    right_label: &str,
    right_table: &Table,
) -> Result<String> {
    match &column.table {
        Some(qualifier) => {
            if (qualifier == left_label || *qualifier == left_table.name)
                && left_table.column(&column.column).is_some()
            {
                Ok(format!("{}.{}", left_label, column.column))
            } else if (qualifier == right_label || *qualifier == right_table.name)
                && right_table.column(&column.column).is_some()
            {
                Ok(format!("{}.{}", right_label, column.column))
            } else {
                Err(Error::ColumnNotFound(column.to_string()))
            }
        }
        None => {
            if left_table.column(&column.column).is_some() {
                Ok(format!("{}.{}", left_label, column.column))
            } else if right_table.column(&column.column).is_some() {
                Ok(format!("{}.{}", right_label, column.column))
            } else {
                Err(Error::ColumnNotFound(column.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BuildSide, build_side};
    use crate::{
        error::{Error, Result},
        sql::{
            engine::Database,
            executor::ResultSet,
            types::{Row, Value},
        },
    };

    #[test]
    fn test_build_side_picks_smaller_relation() {
        assert_eq!(build_side(10, 5), BuildSide::Right);
        assert_eq!(build_side(5, 10), BuildSide::Left);
        assert_eq!(build_side(0, 1), BuildSide::Left);
        assert_eq!(build_side(1, 0), BuildSide::Right);
        // ties build the left side
        assert_eq!(build_side(7, 7), BuildSide::Left);
        assert_eq!(build_side(0, 0), BuildSide::Left);
    }

    /// customers has 3 rows, orders has 4, so the build side flips
    /// depending on which table is named first; results must not
    fn setup() -> Result<Database> {
        let mut db = Database::new();
        db.execute("CREATE TABLE customers (id number pk, name string)")?;
        db.execute("CREATE TABLE orders (id number pk, customer_id number, total number)")?;
        db.execute("INSERT INTO customers (id, name) VALUES (1, 'Ann'), (2, 'Ben'), (3, 'Cyd')")?;
        db.execute(
            "INSERT INTO orders (id, customer_id, total) VALUES \
             (10, 1, 50), (11, 1, 70), (12, 2, 30), (13, null, 99)",
        )?;
        Ok(db)
    }

    fn query(db: &mut Database, sql: &str) -> Result<Vec<Row>> {
        match db.execute(sql)? {
            ResultSet::Query { rows, .. } => Ok(rows),
            other => panic!("expected query result, got {:?}", other),
        }
    }

    #[test]
    fn test_inner_join_exact_pairs() -> Result<()> {
        let mut db = setup()?;
        let rows = query(
            &mut db,
            "SELECT * FROM customers c INNER JOIN orders o ON c.id = o.customer_id",
        )?;
        // Ann matches twice, Ben once, Cyd never, null customer never
        assert_eq!(rows.len(), 3);
        let mut pairs: Vec<(Value, Value)> = rows
            .iter()
            .map(|r| (r["c.id"].clone(), r["o.id"].clone()))
            .collect();
        pairs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(
            pairs,
            vec![
                (Value::Number(1.0), Value::Number(10.0)),
                (Value::Number(1.0), Value::Number(11.0)),
                (Value::Number(2.0), Value::Number(12.0)),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_inner_join_is_symmetric_in_table_order() -> Result<()> {
        let mut db = setup()?;
        let ab = query(
            &mut db,
            "SELECT * FROM customers c JOIN orders o ON c.id = o.customer_id",
        )?;
        let ba = query(
            &mut db,
            "SELECT * FROM orders o JOIN customers c ON o.customer_id = c.id",
        )?;
        assert_eq!(ab.len(), ba.len());

        let key = |r: &Row| (r["c.id"].clone(), r["o.id"].clone());
        let mut ab: Vec<_> = ab.iter().map(key).collect();
        let mut ba: Vec<_> = ba.iter().map(key).collect();
        ab.sort_by(|a, b| a.partial_cmp(b).unwrap());
        ba.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(ab, ba);
        Ok(())
    }

    #[test]
    fn test_left_join_keeps_every_left_row() -> Result<()> {
        let mut db = setup()?;
        let rows = query(
            &mut db,
            "SELECT * FROM customers c LEFT JOIN orders o ON c.id = o.customer_id",
        )?;
        // 2 matches for Ann, 1 for Ben, 1 padded row for Cyd
        assert_eq!(rows.len(), 4);
        let customer_count = query(&mut db, "SELECT * FROM customers")?.len();
        assert!(rows.len() >= customer_count);

        let padded: Vec<&Row> = rows.iter().filter(|r| r.get("o") == Some(&Value::Null)).collect();
        assert_eq!(padded.len(), 1);
        assert_eq!(padded[0]["c.name"], Value::Text("Cyd".to_string()));
        Ok(())
    }

    #[test]
    fn test_right_join_pads_first_table_side() -> Result<()> {
        let mut db = setup()?;
        let rows = query(
            &mut db,
            "SELECT * FROM customers c RIGHT JOIN orders o ON c.id = o.customer_id",
        )?;
        // one row per order; the null-keyed order survives padded
        assert_eq!(rows.len(), 4);
        let padded: Vec<&Row> = rows.iter().filter(|r| r.get("c") == Some(&Value::Null)).collect();
        assert_eq!(padded.len(), 1);
        assert_eq!(padded[0]["o.id"], Value::Number(13.0));
        Ok(())
    }

    #[test]
    fn test_null_join_keys_never_match() -> Result<()> {
        let mut db = Database::new();
        db.execute("CREATE TABLE a (k number)")?;
        db.execute("CREATE TABLE b (k number)")?;
        db.execute("INSERT INTO a (k) VALUES (null), (1)")?;
        db.execute("INSERT INTO b (k) VALUES (null), (2)")?;

        let rows = query(&mut db, "SELECT * FROM a JOIN b ON a.k = b.k")?;
        assert!(rows.is_empty());
        Ok(())
    }

    #[test]
    fn test_join_where_filter_bare_and_qualified() -> Result<()> {
        let mut db = setup()?;
        let rows = query(
            &mut db,
            "SELECT * FROM customers c JOIN orders o ON c.id = o.customer_id WHERE o.total = 70",
        )?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["o.id"], Value::Number(11.0));

        // bare column name matches either alias's namespace
        let rows = query(
            &mut db,
            "SELECT * FROM customers c JOIN orders o ON c.id = o.customer_id WHERE total = 30",
        )?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["c.name"], Value::Text("Ben".to_string()));
        Ok(())
    }

    #[test]
    fn test_join_filter_must_be_equality() -> Result<()> {
        let mut db = setup()?;
        let err = db.execute(
            "SELECT * FROM customers c JOIN orders o ON c.id = o.customer_id WHERE total > 30",
        );
        assert!(matches!(err, Err(Error::UnsupportedWhereClause(_))));
        Ok(())
    }

    #[test]
    fn test_join_on_keys_bind_in_either_order() -> Result<()> {
        let mut db = setup()?;
        let normal = query(
            &mut db,
            "SELECT * FROM customers c JOIN orders o ON c.id = o.customer_id",
        )?;
        let reversed = query(
            &mut db,
            "SELECT * FROM customers c JOIN orders o ON o.customer_id = c.id",
        )?;
        assert_eq!(normal.len(), reversed.len());
        Ok(())
    }

    #[test]
    fn test_join_unknown_key_column() -> Result<()> {
        let mut db = setup()?;
        let err = db.execute("SELECT * FROM customers c JOIN orders o ON c.ghost = o.customer_id");
        assert!(matches!(err, Err(Error::ColumnNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_join_projection_resolution() -> Result<()> {
        let mut db = setup()?;
        let rows = query(
            &mut db,
            "SELECT name, o.total FROM customers c JOIN orders o ON c.id = o.customer_id WHERE o.id = 12",
        )?;
        assert_eq!(rows.len(), 1);
        // bare `name` resolves against the first table's namespace
        assert_eq!(rows[0]["name"], Value::Text("Ben".to_string()));
        assert_eq!(rows[0]["o.total"], Value::Number(30.0));
        Ok(())
    }

    #[test]
    fn test_join_projection_of_padded_rows_reads_null() -> Result<()> {
        let mut db = setup()?;
        let rows = query(
            &mut db,
            "SELECT c.name, o.total FROM customers c LEFT JOIN orders o ON c.id = o.customer_id",
        )?;
        let cyd = rows
            .iter()
            .find(|r| r["c.name"] == Value::Text("Cyd".to_string()))
            .expect("row for Cyd");
        assert_eq!(cyd["o.total"], Value::Null);
        Ok(())
    }
}

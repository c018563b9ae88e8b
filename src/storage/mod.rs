//! Whole-file JSON snapshot persistence
//!
//! The durability model is deliberately simple: after every mutating
//! statement the entire registry is serialized as `{name, columns, rows}`
//! per table and the snapshot file is atomically replaced. Reload goes
//! through `create_table`/`insert`, which rebuilds every index from
//! scratch. There is no WAL and no partial write.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::{
    error::{Error, Result},
    sql::{registry::Registry, schema::Column, types::Row},
};

/// Serialized form of one table
#[derive(Debug, Serialize, Deserialize)]
struct TableSnapshot {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

/// JSON snapshot store for a whole registry
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes every table and atomically replaces the snapshot file
    /// (write to a temp file in the same directory, then rename)
    pub fn save(&self, registry: &Registry) -> Result<()> {
        let mut snapshots = Vec::new();
        for name in registry.table_names() {
            let table = registry.get_table(&name)?;
            snapshots.push(TableSnapshot {
                name,
                columns: table.columns.clone(),
                rows: table.all_rows(),
            });
        }
        let json = serde_json::to_string_pretty(&snapshots)?;

        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut file = NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))?;
        file.write_all(json.as_bytes())?;
        file.persist(&self.path)
            .map_err(|e| Error::Storage(e.to_string()))?;

        info!(path = %self.path.display(), tables = snapshots.len(), "saved snapshot");
        Ok(())
    }

    /// Loads a snapshot back into a fresh registry through the public
    /// table API, so every hash and range index is rebuilt
    pub fn load(&self) -> Result<Registry> {
        let data = std::fs::read_to_string(&self.path)?;
        let snapshots: Vec<TableSnapshot> = serde_json::from_str(&data)?;

        let mut registry = Registry::new();
        for snapshot in snapshots {
            let table = registry.create_table(snapshot.name, snapshot.columns)?;
            for row in snapshot.rows {
                table.insert(row)?;
            }
        }
        info!(path = %self.path.display(), "loaded snapshot");
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::FileStore;
    use crate::{
        error::Result,
        sql::{engine::Database, executor::ResultSet, types::Value},
    };

    #[test]
    fn test_snapshot_round_trip_rebuilds_indices() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("db.json");

        let mut db = Database::open(&path)?;
        db.execute("CREATE TABLE t (id number pk, name string, amount number)")?;
        db.execute("INSERT INTO t (id, name, amount) VALUES (1, 'a', 100), (2, 'b', 900)")?;
        drop(db);

        let mut db = Database::open(&path)?;
        // point lookup goes through the rebuilt hash index
        let ResultSet::Query { rows, .. } = db.execute("SELECT * FROM t WHERE id = 2")? else {
            panic!("expected query result");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], Value::Text("b".to_string()));

        // range query goes through the rebuilt range index
        let ResultSet::Query { rows, .. } =
            db.execute("SELECT * FROM t WHERE amount BETWEEN 0 AND 500")?
        else {
            panic!("expected query result");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], Value::Number(1.0));
        Ok(())
    }

    #[test]
    fn test_save_after_each_mutation() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("db.json");

        let mut db = Database::open(&path)?;
        assert!(!path.exists());
        db.execute("CREATE TABLE t (id number pk)")?;
        assert!(path.exists());

        db.execute("INSERT INTO t (id) VALUES (7)")?;
        let after_insert = std::fs::read_to_string(&path)?;
        assert!(after_insert.contains("7"));

        // a pure query does not rewrite the file
        let before = std::fs::metadata(&path)?.modified()?;
        db.execute("SELECT * FROM t")?;
        assert_eq!(std::fs::metadata(&path)?.modified()?, before);
        Ok(())
    }

    #[test]
    fn test_load_preserves_row_payloads() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("db.json");

        let store = FileStore::new(&path);
        let mut db = Database::open(&path)?;
        db.execute("CREATE TABLE t (id number pk, flag bool, note string)")?;
        db.execute("INSERT INTO t (id, flag, note) VALUES (1, true, null)")?;
        drop(db);

        let registry = store.load()?;
        let rows = registry.get_table("t")?.all_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["flag"], Value::Boolean(true));
        assert_eq!(rows[0]["note"], Value::Null);
        Ok(())
    }
}

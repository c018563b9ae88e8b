use std::path::Path;

use tracing::debug;

use crate::{
    error::Result,
    sql::{executor::ResultSet, parser::Parser, plan::Plan, registry::Registry},
    storage::FileStore,
};

/// Statement execution entry point.
///
/// Execution is single-threaded and synchronous: every statement runs to
/// completion before the next one is processed, so the row store and the
/// indices never disagree from an observer's point of view. Callers needing
/// concurrent access must wrap the whole `Database` in their own lock.
pub struct Database {
    registry: Registry,
    store: Option<FileStore>,
}

impl Database {
    /// In-memory database with no persistence
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            store: None,
        }
    }

    /// Database backed by a JSON snapshot file. An existing file is loaded
    /// through the table API, which rebuilds every index; afterwards each
    /// mutating statement rewrites the whole file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = FileStore::new(path.as_ref());
        let registry = if path.as_ref().exists() {
            store.load()?
        } else {
            Registry::new()
        };
        Ok(Self {
            registry,
            store: Some(store),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Executes a single SQL statement: parse, plan, run, snapshot
    pub fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        debug!(%sql, "executing statement");
        let stmt = Parser::new(sql).parse()?;
        let result = Plan::build(stmt)?.execute(&mut self.registry)?;
        if result.is_mutation() {
            if let Some(store) = &self.store {
                store.save(&self.registry)?;
            }
        }
        Ok(result)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

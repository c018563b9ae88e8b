use std::collections::HashMap;

use tracing::info;

use crate::{
    error::{Error, Result},
    sql::{schema::Column, table::Table},
};

/// Owns the set of named tables. Created on CREATE TABLE, destroyed on
/// drop, mutated by every write statement, serialized wholesale by the
/// snapshot store.
#[derive(Debug, Default)]
pub struct Registry {
    tables: HashMap<String, Table>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(
        &mut self,
        name: impl Into<String>,
        columns: Vec<Column>,
    ) -> Result<&mut Table> {
        let name = name.into();
        if self.tables.contains_key(&name) {
            return Err(Error::TableAlreadyExists(name));
        }
        let table = Table::new(name.clone(), columns)?;
        info!(table = %name, "created table");
        Ok(self.tables.entry(name).or_insert(table))
    }

    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(Error::TableNotFound(name.to_string()));
        }
        info!(table = %name, "dropped table");
        Ok(())
    }

    /// Table names in sorted order, for deterministic serialization
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}

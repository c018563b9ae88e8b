use crate::{
    error::Result,
    sql::{executor::ResultSet, registry::Registry, schema::Column},
};

use super::Executor;

/// CREATE TABLE executor
pub struct CreateTable {
    name: String,
    columns: Vec<Column>,
}

impl CreateTable {
    pub fn new(name: String, columns: Vec<Column>) -> Box<Self> {
        Box::new(Self { name, columns })
    }
}

impl Executor for CreateTable {
    fn execute(self: Box<Self>, registry: &mut Registry) -> Result<ResultSet> {
        registry.create_table(&self.name, self.columns)?;
        Ok(ResultSet::CreateTable {
            table_name: self.name,
        })
    }
}

/// DROP TABLE executor
pub struct DropTable {
    name: String,
}

impl DropTable {
    pub fn new(name: String) -> Box<Self> {
        Box::new(Self { name })
    }
}

impl Executor for DropTable {
    fn execute(self: Box<Self>, registry: &mut Registry) -> Result<ResultSet> {
        registry.drop_table(&self.name)?;
        Ok(ResultSet::DropTable {
            table_name: self.name,
        })
    }
}

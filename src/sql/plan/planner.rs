use crate::{
    error::Result,
    sql::{
        parser::ast,
        plan::{Node, Plan},
        schema::Column,
    },
};

/// Query planner - converts AST into execution plan nodes
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self {}
    }

    /// Builds an execution plan from an AST statement
    pub fn build(&mut self, stmt: ast::Statement) -> Result<Plan> {
        Ok(Plan(self.build_statement(stmt)?))
    }

    fn build_statement(&self, stmt: ast::Statement) -> Result<Node> {
        Ok(match stmt {
            ast::Statement::CreateTable { name, columns } => Node::CreateTable {
                name,
                columns: columns
                    .into_iter()
                    .map(|c| Column {
                        name: c.name,
                        datatype: c.datatype,
                        primary_key: c.primary_key,
                        unique: c.unique,
                        // Unstated nullability resolves to "nullable unless
                        // primary key"
                        nullable: c.nullable.unwrap_or(!c.primary_key),
                    })
                    .collect(),
            },
            ast::Statement::DropTable { name } => Node::DropTable { name },
            ast::Statement::Insert {
                table_name,
                columns,
                values,
            } => Node::Insert {
                table_name,
                columns: columns.unwrap_or_default(),
                values,
            },
            ast::Statement::Select {
                projection,
                from,
                join,
                filter,
            } => {
                // Single-table output columns are bare, so a projection
                // qualifier naming the scanned table resolves to the bare
                // column; joined output keeps alias-qualified names
                let projection = match (&join, projection) {
                    (None, ast::Projection::Columns(columns)) => ast::Projection::Columns(
                        columns
                            .into_iter()
                            .map(|c| match &c.table {
                                Some(q) if *q == from.label() || *q == from.name => {
                                    ast::ColumnRef::bare(c.column)
                                }
                                _ => c,
                            })
                            .collect(),
                    ),
                    (_, projection) => projection,
                };

                let mut node = match join {
                    Some(join) => Node::HashJoin {
                        left: from,
                        right: join.table,
                        kind: join.kind,
                        left_key: join.left_key,
                        right_key: join.right_key,
                        filter,
                    },
                    None => Node::Scan {
                        table: from,
                        filter,
                    },
                };

                if let ast::Projection::Columns(columns) = projection {
                    node = Node::Projection {
                        source: Box::new(node),
                        columns,
                    };
                }
                node
            }
            ast::Statement::Update {
                table_name,
                assignments,
                filter,
            } => Node::Update {
                table_name,
                assignments,
                filter,
            },
            ast::Statement::Delete { table_name, filter } => Node::Delete { table_name, filter },
        })
    }
}

use std::iter::Peekable;

use crate::{
    error::{Error, Result},
    sql::{
        parser::{
            ast::{ColumnDef, ColumnRef, Condition, JoinClause, JoinKind, Projection, TableRef},
            lexer::{Keyword, Lexer, Token},
        },
        types::{DataType, Value},
    },
};

pub mod ast;
mod lexer;

/// SQL Parser - Converts tokens into Abstract Syntax Tree (AST)
///
/// One statement per input. Each statement kind has a fixed grammar with a
/// dedicated parse method; malformed input fails with a syntax error naming
/// what was expected instead of silently matching a wrong branch.
pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given SQL input
    pub fn new(input: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(input).peekable(),
        }
    }

    /// Parses the input SQL statement into an AST
    pub fn parse(&mut self) -> Result<ast::Statement> {
        let stmt = self.parse_statement()?;
        // Trailing semicolon is allowed but not required
        self.next_if_token(Token::Semicolon);
        if let Some(token) = self.peek()? {
            return Err(Error::Syntax(format!(
                "unexpected token {} after statement",
                token
            )));
        }
        Ok(stmt)
    }

    /// Classifies the statement by its leading keyword
    fn parse_statement(&mut self) -> Result<ast::Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Create)) => self.parse_create_table(),
            Some(Token::Keyword(Keyword::Drop)) => self.parse_drop_table(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Select)) => self.parse_select(),
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(token) => Err(Error::UnknownStatement(token.to_string())),
            None => Err(Error::Syntax("empty statement".to_string())),
        }
    }

    /// CREATE TABLE name (col type [pk|primary [key]] [unique] [not null], ...)
    fn parse_create_table(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Create))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;
        let name = self.next_ident()?;
        self.next_expect(Token::OpenParen)?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_def()?);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        self.next_expect(Token::CloseParen)?;
        Ok(ast::Statement::CreateTable { name, columns })
    }

    /// Parses one column definition in CREATE TABLE
    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.next_ident()?;
        let datatype = match self.next()? {
            Token::Keyword(
                Keyword::Number | Keyword::Int | Keyword::Integer | Keyword::Float | Keyword::Double,
            ) => DataType::Number,
            Token::Keyword(Keyword::String | Keyword::Text | Keyword::Varchar) => DataType::Text,
            Token::Keyword(Keyword::Bool | Keyword::Boolean) => DataType::Boolean,
            Token::Ident(other) => return Err(Error::UnsupportedType(other)),
            token => {
                return Err(Error::Syntax(format!(
                    "expected column type, got {}",
                    token
                )));
            }
        };

        let mut column = ColumnDef {
            name,
            datatype,
            primary_key: false,
            unique: false,
            nullable: None,
        };
        while let Some(Token::Keyword(keyword)) = self.next_if_keyword() {
            match keyword {
                Keyword::Pk => column.primary_key = true,
                Keyword::Primary => {
                    // KEY after PRIMARY is optional
                    self.next_if_token(Token::Keyword(Keyword::Key));
                    column.primary_key = true;
                }
                Keyword::Unique => column.unique = true,
                Keyword::Null => column.nullable = Some(true),
                Keyword::Not => {
                    self.next_expect(Token::Keyword(Keyword::Null))?;
                    column.nullable = Some(false);
                }
                k => {
                    return Err(Error::Syntax(format!(
                        "unexpected keyword {} in column definition",
                        k
                    )));
                }
            }
        }
        Ok(column)
    }

    /// DROP TABLE name
    fn parse_drop_table(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Drop))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;
        Ok(ast::Statement::DropTable {
            name: self.next_ident()?,
        })
    }

    /// INSERT INTO name [(col, ...)] VALUES (val, ...)[, (val, ...)]
    fn parse_insert(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Insert))?;
        self.next_expect(Token::Keyword(Keyword::Into))?;
        let table_name = self.next_ident()?;

        let columns = if self.next_if_token(Token::OpenParen).is_some() {
            let mut cols = Vec::new();
            loop {
                cols.push(self.next_ident()?);
                match self.next()? {
                    Token::CloseParen => break,
                    Token::Comma => {}
                    token => {
                        return Err(Error::Syntax(format!(
                            "expected , or ) in column list, got {}",
                            token
                        )));
                    }
                }
            }
            Some(cols)
        } else {
            None
        };

        self.next_expect(Token::Keyword(Keyword::Values))?;
        let mut values = Vec::new();
        loop {
            self.next_expect(Token::OpenParen)?;
            let mut tuple = Vec::new();
            loop {
                tuple.push(self.parse_value()?);
                match self.next()? {
                    Token::CloseParen => break,
                    Token::Comma => {}
                    token => {
                        return Err(Error::Syntax(format!(
                            "expected , or ) in value list, got {}",
                            token
                        )));
                    }
                }
            }
            values.push(tuple);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(ast::Statement::Insert {
            table_name,
            columns,
            values,
        })
    }

    /// SELECT proj FROM name [alias] [join] [WHERE cond]
    fn parse_select(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Select))?;

        let projection = if self.next_if_token(Token::Asterisk).is_some() {
            Projection::All
        } else {
            let mut columns = Vec::new();
            loop {
                columns.push(self.parse_column_ref()?);
                if self.next_if_token(Token::Comma).is_none() {
                    break;
                }
            }
            Projection::Columns(columns)
        };

        self.next_expect(Token::Keyword(Keyword::From))?;
        let from = self.parse_table_ref()?;
        let join = self.parse_join_clause()?;
        let filter = self.parse_where_clause()?;

        Ok(ast::Statement::Select {
            projection,
            from,
            join,
            filter,
        })
    }

    /// UPDATE name SET col = val, ... WHERE cond
    fn parse_update(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Update))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::Set))?;

        let mut assignments: Vec<(String, Value)> = Vec::new();
        loop {
            let col = self.next_ident()?;
            self.next_expect(Token::Equal)?;
            let value = self.parse_value()?;
            if assignments.iter().any(|(name, _)| *name == col) {
                return Err(Error::Syntax(format!("duplicate assignment to {}", col)));
            }
            assignments.push((col, value));
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }

        let filter = self
            .parse_where_clause()?
            .ok_or_else(|| Error::MissingWhereClause("UPDATE".to_string()))?;
        Ok(ast::Statement::Update {
            table_name,
            assignments,
            filter,
        })
    }

    /// DELETE FROM name WHERE cond
    fn parse_delete(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Delete))?;
        self.next_expect(Token::Keyword(Keyword::From))?;
        let table_name = self.next_ident()?;
        let filter = self
            .parse_where_clause()?
            .ok_or_else(|| Error::MissingWhereClause("DELETE".to_string()))?;
        Ok(ast::Statement::Delete { table_name, filter })
    }

    /// [[INNER|LEFT|RIGHT] JOIN name [alias] ON k1 = k2]
    fn parse_join_clause(&mut self) -> Result<Option<JoinClause>> {
        let kind = if self.next_if_token(Token::Keyword(Keyword::Join)).is_some() {
            JoinKind::Inner
        } else if self.next_if_token(Token::Keyword(Keyword::Inner)).is_some() {
            self.next_expect(Token::Keyword(Keyword::Join))?;
            JoinKind::Inner
        } else if self.next_if_token(Token::Keyword(Keyword::Left)).is_some() {
            self.next_expect(Token::Keyword(Keyword::Join))?;
            JoinKind::Left
        } else if self.next_if_token(Token::Keyword(Keyword::Right)).is_some() {
            self.next_expect(Token::Keyword(Keyword::Join))?;
            JoinKind::Right
        } else {
            return Ok(None);
        };

        let table = self.parse_table_ref()?;
        self.next_expect(Token::Keyword(Keyword::On))?;
        let left_key = self.parse_column_ref()?;
        self.next_expect(Token::Equal)?;
        let right_key = self.parse_column_ref()?;

        Ok(Some(JoinClause {
            kind,
            table,
            left_key,
            right_key,
        }))
    }

    /// [WHERE cond] — a single comparison; AND/OR composition is rejected
    fn parse_where_clause(&mut self) -> Result<Option<Condition>> {
        if self.next_if_token(Token::Keyword(Keyword::Where)).is_none() {
            return Ok(None);
        }

        let column = self.parse_column_ref()?;
        let condition = match self.next()? {
            Token::Equal => Condition::Equal(column, self.parse_value()?),
            Token::GreaterThanOrEqual => Condition::GreaterOrEqual(column, self.parse_value()?),
            Token::GreaterThan => Condition::GreaterThan(column, self.parse_value()?),
            Token::LessThanOrEqual => Condition::LessOrEqual(column, self.parse_value()?),
            Token::LessThan => Condition::LessThan(column, self.parse_value()?),
            Token::Keyword(Keyword::Between) => {
                let low = self.parse_value()?;
                self.next_expect(Token::Keyword(Keyword::And))?;
                let high = self.parse_value()?;
                Condition::Between(column, low, high)
            }
            token => {
                return Err(Error::Syntax(format!(
                    "expected comparison operator, got {}",
                    token
                )));
            }
        };

        if let Some(Token::Keyword(Keyword::And | Keyword::Or)) = self.peek()? {
            return Err(Error::UnsupportedWhereClause(
                "only a single comparison is supported".to_string(),
            ));
        }
        Ok(Some(condition))
    }

    /// name [alias]
    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.next_ident()?;
        let alias = match self.peek()? {
            Some(Token::Ident(_)) => Some(self.next_ident()?),
            _ => None,
        };
        Ok(TableRef { name, alias })
    }

    /// column or table.column
    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.next_ident()?;
        if self.next_if_token(Token::Period).is_some() {
            Ok(ColumnRef::qualified(first, self.next_ident()?))
        } else {
            Ok(ColumnRef::bare(first))
        }
    }

    /// Parses a value literal: quoted text, true/false, null, a number
    /// (optionally negated), or a bare token kept as raw text
    fn parse_value(&mut self) -> Result<Value> {
        Ok(match self.next()? {
            Token::Number(n) => Value::Number(n.parse()?),
            Token::Minus => match self.next()? {
                Token::Number(n) => Value::Number(-n.parse::<f64>()?),
                token => {
                    return Err(Error::Syntax(format!("expected number after -, got {}", token)));
                }
            },
            Token::String(s) => Value::Text(s),
            Token::Keyword(Keyword::True) => Value::Boolean(true),
            Token::Keyword(Keyword::False) => Value::Boolean(false),
            Token::Keyword(Keyword::Null) => Value::Null,
            Token::Ident(raw) => Value::Text(raw),
            token => {
                return Err(Error::Syntax(format!("expected value, got {}", token)));
            }
        })
    }

    /// Peeks at the next token
    fn peek(&mut self) -> Result<Option<Token>> {
        self.lexer.peek().cloned().transpose()
    }

    /// Consumes and returns the next token
    fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .unwrap_or_else(|| Err(Error::Syntax("unexpected end of input".to_string())))
    }

    /// Expects and consumes an identifier
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(Error::Syntax(format!(
                "expected identifier, got {}",
                token
            ))),
        }
    }

    /// Expects a specific token, returns error if different
    fn next_expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::Syntax(format!(
                "expected token {}, got {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// Consumes next token if it satisfies the predicate
    fn next_if<F: Fn(&Token) -> bool>(&mut self, predicate: F) -> Option<Token> {
        self.peek().unwrap_or(None).filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Consumes next token if it's a keyword
    fn next_if_keyword(&mut self) -> Option<Token> {
        self.next_if(|t| matches!(t, Token::Keyword(_)))
    }

    /// Consumes next token if it matches the given token
    fn next_if_token(&mut self, token: Token) -> Option<Token> {
        self.next_if(|t| t == &token)
    }
}

#[cfg(test)]
mod tests {
    use super::Parser;
    use crate::{
        error::{Error, Result},
        sql::{
            parser::ast::{
                self, ColumnRef, Condition, JoinKind, Projection,
            },
            types::{DataType, Value},
        },
    };

    #[test]
    fn test_parser_create_table() -> Result<()> {
        let stmt = Parser::new("CREATE TABLE t (id number pk, name string unique, ok bool not null)")
            .parse()?;
        let ast::Statement::CreateTable { name, columns } = stmt else {
            panic!("expected CreateTable");
        };
        assert_eq!(name, "t");
        assert_eq!(columns.len(), 3);
        assert!(columns[0].primary_key);
        assert_eq!(columns[0].datatype, DataType::Number);
        assert!(columns[1].unique);
        assert_eq!(columns[2].nullable, Some(false));

        // PRIMARY KEY and PRIMARY both mark the primary key
        let stmt1 = Parser::new("create table t (id int primary key)").parse()?;
        let stmt2 = Parser::new("create table t (id int primary)").parse()?;
        assert_eq!(stmt1, stmt2);
        Ok(())
    }

    #[test]
    fn test_parser_unsupported_type() {
        let err = Parser::new("CREATE TABLE t (ts datetime)").parse();
        assert_eq!(err, Err(Error::UnsupportedType("datetime".to_string())));
    }

    #[test]
    fn test_parser_insert() -> Result<()> {
        let stmt = Parser::new("insert into tbl (a, b, c, d) values (1, 'x', true, null);").parse()?;
        assert_eq!(
            stmt,
            ast::Statement::Insert {
                table_name: "tbl".to_string(),
                columns: Some(vec![
                    "a".to_string(),
                    "b".to_string(),
                    "c".to_string(),
                    "d".to_string()
                ]),
                values: vec![vec![
                    Value::Number(1.0),
                    Value::Text("x".to_string()),
                    Value::Boolean(true),
                    Value::Null,
                ]],
            }
        );

        // multi-row insert, no column list, negative number, bare token
        let stmt = Parser::new("INSERT INTO t VALUES (-1.5, Alice), (2, Bob)").parse()?;
        assert_eq!(
            stmt,
            ast::Statement::Insert {
                table_name: "t".to_string(),
                columns: None,
                values: vec![
                    vec![Value::Number(-1.5), Value::Text("Alice".to_string())],
                    vec![Value::Number(2.0), Value::Text("Bob".to_string())],
                ],
            }
        );
        Ok(())
    }

    #[test]
    fn test_parser_select_where_operators() -> Result<()> {
        let cases: Vec<(&str, Condition)> = vec![
            (
                "SELECT * FROM t WHERE a = 1",
                Condition::Equal(ColumnRef::bare("a"), Value::Number(1.0)),
            ),
            (
                "SELECT * FROM t WHERE a > 1",
                Condition::GreaterThan(ColumnRef::bare("a"), Value::Number(1.0)),
            ),
            (
                "SELECT * FROM t WHERE a >= 1",
                Condition::GreaterOrEqual(ColumnRef::bare("a"), Value::Number(1.0)),
            ),
            (
                "SELECT * FROM t WHERE a < 1",
                Condition::LessThan(ColumnRef::bare("a"), Value::Number(1.0)),
            ),
            (
                "SELECT * FROM t WHERE a <= 1",
                Condition::LessOrEqual(ColumnRef::bare("a"), Value::Number(1.0)),
            ),
            (
                "SELECT * FROM t WHERE a BETWEEN 1 AND 5",
                Condition::Between(ColumnRef::bare("a"), Value::Number(1.0), Value::Number(5.0)),
            ),
        ];
        for (sql, expected) in cases {
            let stmt = Parser::new(sql).parse()?;
            let ast::Statement::Select { filter, .. } = stmt else {
                panic!("expected Select for {}", sql);
            };
            assert_eq!(filter, Some(expected), "{}", sql);
        }
        Ok(())
    }

    #[test]
    fn test_parser_rejects_multiple_conditions() {
        let err = Parser::new("SELECT * FROM t WHERE a = 1 AND b = 2").parse();
        assert!(matches!(err, Err(Error::UnsupportedWhereClause(_))));

        let err = Parser::new("SELECT * FROM t WHERE a BETWEEN 1 AND 5 OR b = 2").parse();
        assert!(matches!(err, Err(Error::UnsupportedWhereClause(_))));

        let err = Parser::new("UPDATE t SET a = 1 WHERE a = 1 AND b = 2").parse();
        assert!(matches!(err, Err(Error::UnsupportedWhereClause(_))));
    }

    #[test]
    fn test_parser_select_join() -> Result<()> {
        let stmt = Parser::new(
            "SELECT c.name, total FROM customers c LEFT JOIN orders o ON c.id = o.customer_id WHERE status = 'open'",
        )
        .parse()?;
        let ast::Statement::Select {
            projection,
            from,
            join,
            filter,
        } = stmt
        else {
            panic!("expected Select");
        };

        assert_eq!(
            projection,
            Projection::Columns(vec![
                ColumnRef::qualified("c", "name"),
                ColumnRef::bare("total"),
            ])
        );
        assert_eq!(from.name, "customers");
        assert_eq!(from.label(), "c");

        let join = join.expect("join clause");
        assert_eq!(join.kind, JoinKind::Left);
        assert_eq!(join.table.label(), "o");
        assert_eq!(join.left_key, ColumnRef::qualified("c", "id"));
        assert_eq!(join.right_key, ColumnRef::qualified("o", "customer_id"));

        assert_eq!(
            filter,
            Some(Condition::Equal(
                ColumnRef::bare("status"),
                Value::Text("open".to_string())
            ))
        );
        Ok(())
    }

    #[test]
    fn test_parser_join_kinds() -> Result<()> {
        for (sql, kind) in [
            ("SELECT * FROM a JOIN b ON a.x = b.x", JoinKind::Inner),
            ("SELECT * FROM a INNER JOIN b ON a.x = b.x", JoinKind::Inner),
            ("SELECT * FROM a LEFT JOIN b ON a.x = b.x", JoinKind::Left),
            ("SELECT * FROM a RIGHT JOIN b ON a.x = b.x", JoinKind::Right),
        ] {
            let ast::Statement::Select { join, .. } = Parser::new(sql).parse()? else {
                panic!("expected Select");
            };
            assert_eq!(join.expect("join").kind, kind, "{}", sql);
        }
        Ok(())
    }

    #[test]
    fn test_parser_update_delete_require_where() {
        assert_eq!(
            Parser::new("UPDATE t SET a = 1").parse(),
            Err(Error::MissingWhereClause("UPDATE".to_string()))
        );
        assert_eq!(
            Parser::new("DELETE FROM t").parse(),
            Err(Error::MissingWhereClause("DELETE".to_string()))
        );
    }

    #[test]
    fn test_parser_update() -> Result<()> {
        let stmt = Parser::new("UPDATE t SET a = 2, b = 'x' WHERE id = 1").parse()?;
        assert_eq!(
            stmt,
            ast::Statement::Update {
                table_name: "t".to_string(),
                assignments: vec![
                    ("a".to_string(), Value::Number(2.0)),
                    ("b".to_string(), Value::Text("x".to_string())),
                ],
                filter: Condition::Equal(ColumnRef::bare("id"), Value::Number(1.0)),
            }
        );

        let err = Parser::new("UPDATE t SET a = 1, a = 2 WHERE id = 1").parse();
        assert!(matches!(err, Err(Error::Syntax(_))));
        Ok(())
    }

    #[test]
    fn test_parser_unknown_statement() {
        assert_eq!(
            Parser::new("EXPLAIN SELECT * FROM t").parse(),
            Err(Error::UnknownStatement("EXPLAIN".to_string()))
        );
        assert_eq!(
            Parser::new("* FROM t").parse(),
            Err(Error::UnknownStatement("*".to_string()))
        );
    }

    #[test]
    fn test_parser_rejects_trailing_tokens() {
        let err = Parser::new("DROP TABLE t t2").parse();
        assert!(matches!(err, Err(Error::Syntax(_))));
    }

    #[test]
    fn test_parser_drop_table() -> Result<()> {
        assert_eq!(
            Parser::new("DROP TABLE old_data;").parse()?,
            ast::Statement::DropTable {
                name: "old_data".to_string()
            }
        );
        Ok(())
    }
}

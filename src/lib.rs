//! reldb - An embedded relational database engine in Rust
//!
//! This crate provides a minimal SQL database with:
//! - Typed table storage with primary-key/unique/null constraints
//! - Hash indices for point lookups, B-tree indices for range queries
//! - SQL parsing (lexer, parser, AST) for a small statement dialect
//! - Query planning and execution, including two-table hash joins
//! - Whole-file JSON snapshot persistence

pub mod error;
pub mod sql;
pub mod storage;

//! # zesk-schema
//!
//! Table models, native type rules and a schema differ for the zesk ORM.
//!
//! This crate provides:
//! - [`Column`], [`Index`] and [`Table`] snapshots of declared or live tables
//! - A parser turning `CREATE TABLE` scripts into snapshots
//! - A differ computing the DDL that brings a live table in line with a
//!   declared one, rendered through a MySQL or PostgreSQL dialect
//!
//! ## Example
//!
//! ```rust
//! use zesk_schema::{parse_table, update, DiffOptions, MySqlDialect};
//!
//! let declared = parse_table(
//!     "CREATE TABLE t (id int NOT NULL, created timestamp NULL)",
//! ).unwrap();
//! let live = parse_table(
//!     "CREATE TABLE t (id int NOT NULL, created datetime NOT NULL)",
//! ).unwrap();
//!
//! let sql = update(&declared, &live, &MySqlDialect::new(), DiffOptions::default()).unwrap();
//! assert_eq!(sql, vec!["ALTER TABLE `t` CHANGE COLUMN `created` `created` timestamp NULL"]);
//! ```

pub mod change;
pub mod column;
pub mod database;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod index;
pub mod lexer;
pub mod parser;
pub mod table;
pub mod types;
pub mod value;

pub use change::Change;
pub use column::{Column, ColumnField, IndexMembership};
pub use database::{ColumnInfo, Database, QueryResult, ScriptDatabase, Synchronizer};
pub use dialect::{MySqlDialect, PostgresDialect, SchemaDialect};
pub use diff::{diff_tables, update, DiffOptions, DiffWarning, TableDiff};
pub use error::{Result, SchemaError};
pub use index::{Index, IndexColumn, IndexStructure, IndexType, PRIMARY_INDEX};
pub use parser::{parse_table, parse_tables};
pub use table::Table;
pub use types::{TypeClass, TypeMap};
pub use value::SqlValue;

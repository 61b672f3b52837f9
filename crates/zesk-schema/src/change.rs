//! Schema changes produced by the differ.
//!
//! Each change is rendered into one or more DDL statements by a
//! [`SchemaDialect`](crate::dialect::SchemaDialect).

use std::collections::BTreeMap;

use crate::column::Column;
use crate::index::Index;
use crate::table::Table;

/// A single schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Create a table from scratch, followed by its on-create actions.
    CreateTable(CreateTableOp),
    /// Change table-level attributes.
    AlterAttributes(AlterAttributesOp),
    /// Add a column.
    AddColumn(AddColumnOp),
    /// Retype and/or rename a column.
    ChangeColumn(ChangeColumnOp),
    /// Drop a column.
    DropColumn(DropColumnOp),
    /// Add an index.
    AddIndex(AddIndexOp),
    /// Drop an index.
    DropIndex(DropIndexOp),
}

impl Change {
    /// Short label used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "create_table",
            Self::AlterAttributes(_) => "alter_attributes",
            Self::AddColumn(_) => "add_column",
            Self::ChangeColumn(_) => "change_column",
            Self::DropColumn(_) => "drop_column",
            Self::AddIndex(_) => "add_index",
            Self::DropIndex(_) => "drop_index",
        }
    }
}

/// CREATE TABLE operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableOp {
    /// The full declared table.
    pub table: Table,
}

/// Table attribute change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterAttributesOp {
    /// Table name.
    pub table: String,
    /// Attributes to set, keyed by lowercased name.
    pub attributes: BTreeMap<String, String>,
}

/// ADD COLUMN operation.
#[derive(Debug, Clone, PartialEq)]
pub struct AddColumnOp {
    /// Table name.
    pub table: String,
    /// Column definition.
    pub column: Column,
    /// Column to place the new one after.
    pub after: Option<String>,
    /// Declare the primary key inline with the column.
    pub inline_primary: bool,
}

/// CHANGE COLUMN operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeColumnOp {
    /// Table name.
    pub table: String,
    /// Live column being replaced.
    pub from: Column,
    /// Declared column definition.
    pub to: Column,
    /// Declare the primary key inline with the column.
    pub inline_primary: bool,
}

impl ChangeColumnOp {
    /// Returns true when the column is renamed.
    #[must_use]
    pub fn is_rename(&self) -> bool {
        self.from.name != self.to.name
    }
}

/// DROP COLUMN operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropColumnOp {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

/// ADD INDEX operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddIndexOp {
    /// Index definition.
    pub index: Index,
}

/// DROP INDEX operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIndexOp {
    /// Live index being dropped.
    pub index: Index,
}

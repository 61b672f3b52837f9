//! Dialect-specific DDL generation.
//!
//! Quoting, column definitions and the syntax of each schema change differ
//! between databases. The differ only produces [`Change`]s; a dialect turns
//! them into statements.

mod mysql;
mod postgres;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use std::collections::BTreeMap;

use crate::change::{
    AddColumnOp, AddIndexOp, AlterAttributesOp, Change, ChangeColumnOp, CreateTableOp,
    DropColumnOp, DropIndexOp,
};
use crate::column::Column;
use crate::error::{Result, SchemaError};
use crate::index::{Index, IndexStructure, IndexType};
use crate::types::TypeMap;
use crate::value::SqlValue;

/// Trait for dialect-specific schema SQL generation.
pub trait SchemaDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Native type rules for this database.
    fn types(&self) -> &TypeMap;

    /// Generates the statements for a change.
    fn generate_sql(&self, change: &Change) -> Result<Vec<String>> {
        match change {
            Change::CreateTable(op) => self.create_table(op),
            Change::AlterAttributes(op) => Ok(self.alter_attributes(op)),
            Change::AddColumn(op) => Ok(vec![self.add_column(op)]),
            Change::ChangeColumn(op) => Ok(self.change_column(op)),
            Change::DropColumn(op) => Ok(vec![self.drop_column(op)]),
            Change::AddIndex(op) => Ok(vec![self.add_index(op)]),
            Change::DropIndex(op) => self.drop_index(op),
        }
    }

    /// Generates CREATE TABLE followed by the table's on-create actions.
    fn create_table(&self, op: &CreateTableOp) -> Result<Vec<String>>;

    /// Generates the statements changing table attributes.
    fn alter_attributes(&self, op: &AlterAttributesOp) -> Vec<String>;

    /// Generates SQL for ADD COLUMN.
    fn add_column(&self, op: &AddColumnOp) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.quote_table(&op.table),
            self.quote_column(&op.column.name),
            self.column_definition(&op.column, op.inline_primary)
        )
    }

    /// Generates SQL for CHANGE COLUMN.
    fn change_column(&self, op: &ChangeColumnOp) -> Vec<String>;

    /// Generates SQL for DROP COLUMN.
    fn drop_column(&self, op: &DropColumnOp) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_table(&op.table),
            self.quote_column(&op.column)
        )
    }

    /// Generates SQL for adding an index.
    fn add_index(&self, op: &AddIndexOp) -> String;

    /// Generates SQL for dropping an index.
    fn drop_index(&self, op: &DropIndexOp) -> Result<Vec<String>>;

    /// Generates the type and constraints following a column name.
    fn column_definition(&self, column: &Column, inline_primary: bool) -> String;

    /// Renders the DEFAULT clause for a column, empty when none applies.
    fn default_clause(&self, column: &Column) -> String {
        let Some(default) = &column.default else {
            return String::new();
        };
        let sql_type = column.sql_type();
        if default.is_null() {
            return String::from(" DEFAULT NULL");
        }
        if self.types().forbids_default(sql_type) {
            return String::new();
        }
        match self
            .types()
            .normalize_default(sql_type, Some(default), column.is_required())
        {
            Some(value) => format!(" DEFAULT {}", self.render_value(&value)),
            None => String::new(),
        }
    }

    /// Renders a scalar value inline.
    fn render_value(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => String::from("NULL"),
            SqlValue::Bool(b) => String::from(self.boolean_literal(*b)),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Text(s) => self.quote_text(s),
            SqlValue::Expression(expr) => expr.clone(),
        }
    }

    /// Boolean literal.
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char;

    /// Quotes a single identifier, doubling embedded quote characters.
    fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quotes a possibly dotted table name.
    fn quote_table(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quotes a possibly dotted column reference such as `alias.column`.
    fn quote_column(&self, name: &str) -> String {
        self.quote_table(name)
    }

    /// Quotes a text literal.
    fn quote_text(&self, text: &str) -> String {
        format!("'{}'", text.replace('\'', "''"))
    }

    /// Structure used when an index does not name one.
    fn default_index_structure(&self, _kind: IndexType) -> IndexStructure {
        IndexStructure::BTree
    }

    /// Table attributes assumed when a table does not set them.
    fn table_attribute_defaults(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Returns true when dropping `dropped` columns also removes `index`.
    fn drops_index_with_columns(&self, index: &Index, dropped: &[&str]) -> bool {
        index.column_names().all(|c| dropped.contains(&c))
    }

    /// Renders an index column list.
    fn index_columns(&self, index: &Index) -> String {
        index
            .columns
            .iter()
            .map(|c| match c.size {
                Some(size) if size > 0 => format!("{}({size})", self.quote_column(&c.name)),
                _ => self.quote_column(&c.name),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Fails when an index has no name and cannot be dropped.
pub(crate) fn require_index_name(index: &Index) -> Result<()> {
    if index.name.trim().is_empty() {
        return Err(SchemaError::Semantics(format!(
            "Cannot drop an unnamed index on table '{}'",
            index.table
        )));
    }
    Ok(())
}

/// Renders table attributes as `KEY=value` pairs, engine first.
pub(crate) fn attribute_pairs(attributes: &BTreeMap<String, String>) -> String {
    let engine = attributes.get_key_value("engine");
    engine
        .into_iter()
        .chain(attributes.iter().filter(|(key, _)| key.as_str() != "engine"))
        .map(|(key, value)| {
            let key = match key.as_str() {
                "charset" => String::from("DEFAULT CHARSET"),
                other => other.to_uppercase(),
            };
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

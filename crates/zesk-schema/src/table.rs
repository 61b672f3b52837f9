//! Table model.
//!
//! A table is built in two phases: columns are added first, then
//! [`Table::finalize_indexes`] collects the index memberships declared on
//! those columns into named indexes. Indexes attached explicitly through
//! [`Table::add_index`] are kept alongside the collected ones.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::change::Change;
use crate::column::Column;
use crate::dialect::SchemaDialect;
use crate::error::{Result, SchemaError};
use crate::index::{Index, IndexType, PRIMARY_INDEX};
use crate::parser::parse_table;

/// A table snapshot, either declared in code or introspected from a database.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Table name.
    pub name: String,
    columns: IndexMap<String, Column>,
    indexes: IndexMap<String, Index>,
    attributes: BTreeMap<String, String>,
    on_create: Vec<String>,
    finalized: bool,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
            attributes: BTreeMap::new(),
            on_create: Vec::new(),
            finalized: false,
        }
    }

    /// Adds a column, failing on duplicates and typeless columns.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        self.check_new_column(&column)?;
        let index = self.columns.len();
        self.insert_column(index, column);
        Ok(())
    }

    /// Adds a column directly after `after`.
    pub fn add_column_after(&mut self, column: Column, after: &str) -> Result<()> {
        self.check_new_column(&column)?;
        let position = self
            .columns
            .get_index_of(after)
            .ok_or_else(|| self.column_not_found(after))?;
        self.insert_column(position + 1, column);
        Ok(())
    }

    /// Builder form of [`Table::add_column`].
    pub fn with_column(mut self, column: Column) -> Result<Self> {
        self.add_column(column)?;
        Ok(self)
    }

    fn check_new_column(&self, column: &Column) -> Result<()> {
        if self.columns.contains_key(&column.name) {
            return Err(SchemaError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name.clone(),
            });
        }
        if column.sql_type().trim().is_empty() {
            return Err(SchemaError::MissingSqlType {
                table: self.name.clone(),
                column: column.name.clone(),
            });
        }
        Ok(())
    }

    fn insert_column(&mut self, position: usize, column: Column) {
        let memberships = column.indexes.clone();
        let name = column.name.clone();
        self.columns.shift_insert(position, name.clone(), column);
        if self.finalized {
            for membership in memberships {
                self.collect_membership(&name, membership.kind, &membership.name, membership.size);
            }
        }
    }

    /// Collects column index memberships into named indexes.
    ///
    /// Runs once; later calls are no-ops.
    pub fn finalize_indexes(&mut self) {
        if self.finalized {
            return;
        }
        let memberships: Vec<_> = self
            .columns
            .values()
            .flat_map(|column| {
                column
                    .indexes
                    .iter()
                    .map(move |m| (column.name.clone(), m.kind, m.name.clone(), m.size))
            })
            .collect();
        for (column, kind, name, size) in memberships {
            self.collect_membership(&column, kind, &name, size);
        }
        self.finalized = true;
    }

    /// Builder form of [`Table::finalize_indexes`].
    #[must_use]
    pub fn finalized(mut self) -> Self {
        self.finalize_indexes();
        self
    }

    /// Returns true once indexes have been collected.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn collect_membership(&mut self, column: &str, kind: IndexType, name: &str, size: Option<u32>) {
        let table = self.name.clone();
        self.indexes
            .entry(name.to_string())
            .or_insert_with(|| Index::new(table, name, kind))
            .add_column(column, size);
    }

    /// Attaches an index, failing when the name is taken or a column is unknown.
    pub fn add_index(&mut self, index: Index) -> Result<()> {
        if self.indexes.contains_key(&index.name) {
            return Err(SchemaError::DuplicateIndex {
                table: self.name.clone(),
                index: index.name,
            });
        }
        if let Some(missing) = index.column_names().find(|c| !self.columns.contains_key(*c)) {
            return Err(self.column_not_found(missing));
        }
        if index.is_primary() {
            for name in index.column_names() {
                if let Some(column) = self.columns.get_mut(name) {
                    column.primary_key = true;
                    column.required.get_or_insert(true);
                }
            }
        }
        self.indexes.insert(index.name.clone(), index);
        Ok(())
    }

    /// Replaces the primary index, returning the previous one.
    ///
    /// Columns of the old primary index lose their primary key flag before
    /// the new index flags its own columns.
    pub fn set_primary(&mut self, index: Index) -> Result<Option<Index>> {
        if !index.is_primary() {
            return Err(SchemaError::Semantics(format!(
                "Index '{}' is not a primary key",
                index.name
            )));
        }
        let previous = if self.indexes.contains_key(PRIMARY_INDEX) {
            Some(self.remove_index(PRIMARY_INDEX)?)
        } else {
            None
        };
        self.add_index(index)?;
        Ok(previous)
    }

    /// Detaches an index and removes the matching column memberships.
    pub fn remove_index(&mut self, name: &str) -> Result<Index> {
        let index = self
            .indexes
            .shift_remove(name)
            .ok_or_else(|| SchemaError::IndexNotFound {
                table: self.name.clone(),
                index: name.to_string(),
            })?;
        for column in self.columns.values_mut() {
            column.indexes.retain(|m| m.name != index.name);
            if index.is_primary() && index.has_column(&column.name) {
                column.primary_key = false;
                column.required = None;
            }
        }
        Ok(index)
    }

    /// Looks up a column.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns.get(name).ok_or_else(|| self.column_not_found(name))
    }

    /// Looks up a column for modification.
    pub fn column_mut(&mut self, name: &str) -> Result<&mut Column> {
        let table = &self.name;
        self.columns
            .get_mut(name)
            .ok_or_else(|| SchemaError::ColumnNotFound {
                table: table.clone(),
                column: name.to_string(),
            })
    }

    /// Returns true when the column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The column declared immediately before `name`.
    #[must_use]
    pub fn previous_column(&self, name: &str) -> Option<&Column> {
        let position = self.columns.get_index_of(name)?;
        position
            .checked_sub(1)
            .and_then(|p| self.columns.get_index(p))
            .map(|(_, column)| column)
    }

    /// Looks up an index.
    pub fn index(&self, name: &str) -> Result<&Index> {
        self.indexes.get(name).ok_or_else(|| SchemaError::IndexNotFound {
            table: self.name.clone(),
            index: name.to_string(),
        })
    }

    /// Indexes in collection order.
    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values()
    }

    /// Number of indexes.
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    /// The primary index, if any.
    #[must_use]
    pub fn primary_index(&self) -> Option<&Index> {
        self.indexes.get(PRIMARY_INDEX)
    }

    /// Sets a table attribute such as `engine`, `charset` or `collate`.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        self.attributes.insert(key.to_lowercase(), value.into());
    }

    /// Builder form of [`Table::set_attribute`].
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Explicit table attributes.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Attributes with the dialect defaults filled in.
    #[must_use]
    pub fn effective_attributes(&self, dialect: &dyn SchemaDialect) -> BTreeMap<String, String> {
        let mut attributes: BTreeMap<String, String> = dialect
            .table_attribute_defaults()
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        for (key, value) in &self.attributes {
            attributes.insert(key.clone(), value.clone());
        }
        attributes
    }

    /// Compares table attributes after applying dialect defaults.
    #[must_use]
    pub fn attributes_similar(&self, that: &Self, dialect: &dyn SchemaDialect) -> bool {
        let mine = self.effective_attributes(dialect);
        let theirs = that.effective_attributes(dialect);
        mine.len() == theirs.len()
            && mine
                .iter()
                .all(|(k, v)| theirs.get(k).is_some_and(|t| t.eq_ignore_ascii_case(v)))
    }

    /// Registers a statement to run right after the table is created.
    pub fn add_on_create(&mut self, sql: impl Into<String>) {
        self.on_create.push(sql.into());
    }

    /// Statements run right after `CREATE TABLE`.
    #[must_use]
    pub fn on_create_actions(&self) -> &[String] {
        &self.on_create
    }

    /// Compares attributes, then every column and index by name.
    ///
    /// Declaration order of columns does not matter.
    #[must_use]
    pub fn is_similar(&self, that: &Self, dialect: &dyn SchemaDialect) -> bool {
        let types = dialect.types();
        self.attributes_similar(that, dialect)
            && self.column_count() == that.column_count()
            && self.index_count() == that.index_count()
            && self.columns().all(|column| {
                that.columns
                    .get(&column.name)
                    .is_some_and(|other| column.is_similar(other, types))
            })
            && self.indexes().all(|index| {
                that.indexes
                    .get(&index.name)
                    .is_some_and(|other| index.is_similar(other, dialect))
            })
    }

    // ====================================================================
    // Replaying changes
    // ====================================================================

    /// Applies an executed change to this snapshot.
    ///
    /// Columns are stored the way `dialect` renders them, so attributes the
    /// database cannot hold (such as `unsigned` on PostgreSQL) are lost and
    /// indexes the database drops together with their columns disappear.
    pub fn apply_change(&mut self, change: &Change, dialect: &dyn SchemaDialect) -> Result<()> {
        match change {
            Change::CreateTable(op) => {
                let script = dialect.create_table(op)?.join(";\n");
                *self = parse_table(&script)?;
            }
            Change::AlterAttributes(op) => {
                for (key, value) in &op.attributes {
                    self.set_attribute(key, value.clone());
                }
            }
            Change::AddColumn(op) => {
                let stored = self.stored_column(&op.column, op.inline_primary, dialect)?;
                match op.after.as_deref().filter(|after| self.has_column(after)) {
                    Some(after) => self.add_column_after(stored, after)?,
                    None => self.add_column(stored)?,
                }
                if op.inline_primary && op.column.primary_key {
                    self.add_index(Index::primary(self.name.clone()).column(op.column.name.clone()))?;
                }
            }
            Change::ChangeColumn(op) => {
                let position = self
                    .columns
                    .get_index_of(&op.from.name)
                    .ok_or_else(|| self.column_not_found(&op.from.name))?;
                let mut stored = self.stored_column(&op.to, op.inline_primary, dialect)?;
                if let Some((_, old)) = self.columns.shift_remove_index(position) {
                    stored.primary_key = old.primary_key;
                    stored.indexes = old.indexes;
                }
                self.columns.shift_insert(position, stored.name.clone(), stored);
                for index in self.indexes.values_mut() {
                    for column in &mut index.columns {
                        if column.name == op.from.name {
                            column.name.clone_from(&op.to.name);
                        }
                    }
                }
                if op.inline_primary && op.to.primary_key && self.primary_index().is_none() {
                    self.add_index(Index::primary(self.name.clone()).column(op.to.name.clone()))?;
                }
            }
            Change::DropColumn(op) => {
                self.columns
                    .shift_remove(&op.column)
                    .ok_or_else(|| self.column_not_found(&op.column))?;
                let dropped = [op.column.as_str()];
                self.indexes
                    .retain(|_, index| !dialect.drops_index_with_columns(index, &dropped));
                for index in self.indexes.values_mut() {
                    index.columns.retain(|column| column.name != op.column);
                }
                self.indexes.retain(|_, index| !index.columns.is_empty());
            }
            Change::AddIndex(op) => {
                if op.index.is_primary() {
                    self.set_primary(op.index.clone())?;
                } else {
                    self.add_index(op.index.clone())?;
                }
            }
            Change::DropIndex(op) => {
                self.remove_index(&op.index.name)?;
            }
        }
        Ok(())
    }

    /// A column as the database reports it after `dialect` defined it.
    fn stored_column(
        &self,
        column: &Column,
        inline_primary: bool,
        dialect: &dyn SchemaDialect,
    ) -> Result<Column> {
        let sql = format!(
            "CREATE TABLE {} ({} {})",
            dialect.quote_table(&self.name),
            dialect.quote_column(&column.name),
            dialect.column_definition(column, inline_primary)
        );
        let mut stored = parse_table(&sql)?.column(&column.name)?.clone();
        stored.indexes.clear();
        stored.primary_key = false;
        Ok(stored)
    }

    fn column_not_found(&self, name: &str) -> SchemaError {
        SchemaError::ColumnNotFound {
            table: self.name.clone(),
            column: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::MySqlDialect;

    fn people() -> Table {
        let mut table = Table::new("people");
        table
            .add_column(Column::new("id", "int(11)").unsigned().increment().primary_key())
            .unwrap();
        table
            .add_column(Column::new("email", "varchar(128)").not_null().unique(""))
            .unwrap();
        table
            .add_column(Column::new("name", "varchar(64)").index("name_email"))
            .unwrap();
        table.column_mut("email").unwrap().add_membership(IndexType::Index, "name_email", None);
        table.finalized()
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut table = people();
        let err = table.add_column(Column::new("email", "text")).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_typeless_column_rejected() {
        let mut table = Table::new("t");
        let err = table.add_column(Column::untyped("x")).unwrap_err();
        assert!(matches!(err, SchemaError::MissingSqlType { .. }));
    }

    #[test]
    fn test_finalize_collects_memberships_in_column_order() {
        let table = people();
        let names: Vec<_> = table.indexes().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["primary", "email_Unique", "name_email"]);
        let composite = table.index("name_email").unwrap();
        assert_eq!(composite.column_names().collect::<Vec<_>>(), vec!["email", "name"]);
    }

    #[test]
    fn test_add_column_after() {
        let mut table = people();
        table.add_column_after(Column::new("age", "int"), "id").unwrap();
        let names: Vec<_> = table.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "age", "email", "name"]);
        assert_eq!(table.previous_column("age").unwrap().name, "id");
        assert!(table.previous_column("id").is_none());
        assert!(table.add_column_after(Column::new("x", "int"), "nope").is_err());
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let mut table = people();
        let err = table
            .add_index(Index::new("people", "email_Unique", IndexType::Unique).column("email"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateIndex { .. }));
    }

    #[test]
    fn test_index_on_unknown_column_rejected() {
        let mut table = people();
        let err = table
            .add_index(Index::new("people", "ghost", IndexType::Index).column("ghost"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_set_primary_replaces_and_clears_flags() {
        let mut table = people();
        let previous = table
            .set_primary(Index::primary("people").column("email"))
            .unwrap()
            .unwrap();
        assert_eq!(previous.column_names().collect::<Vec<_>>(), vec!["id"]);
        assert!(!table.column("id").unwrap().primary_key);
        assert!(table.column("email").unwrap().primary_key);
        assert_eq!(table.index_count(), 3);
    }

    #[test]
    fn test_lookup_failures() {
        let table = people();
        assert!(matches!(
            table.column("missing"),
            Err(SchemaError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            table.index("missing"),
            Err(SchemaError::IndexNotFound { .. })
        ));
    }

    #[test]
    fn test_apply_change_drops_covering_index_with_column() {
        let dialect = MySqlDialect::new();
        let mut table = people();
        table
            .apply_change(
                &Change::DropColumn(crate::change::DropColumnOp {
                    table: String::from("people"),
                    column: String::from("name"),
                }),
                &dialect,
            )
            .unwrap();
        assert!(!table.has_column("name"));
        let remaining = table.index("name_email").unwrap();
        assert_eq!(remaining.column_names().collect::<Vec<_>>(), vec!["email"]);
    }

    #[test]
    fn test_apply_change_renames_index_columns() {
        let dialect = MySqlDialect::new();
        let mut table = people();
        let from = table.column("email").unwrap().clone();
        let to = Column::new("mail", "varchar(128)").not_null();
        table
            .apply_change(
                &Change::ChangeColumn(crate::change::ChangeColumnOp {
                    table: String::from("people"),
                    from,
                    to,
                    inline_primary: false,
                }),
                &dialect,
            )
            .unwrap();
        let names: Vec<_> = table.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "mail", "name"]);
        assert_eq!(
            table.index("email_Unique").unwrap().column_names().collect::<Vec<_>>(),
            vec!["mail"]
        );
    }

    #[test]
    fn test_similarity_ignores_column_order() {
        let dialect = MySqlDialect::new();
        let a = Table::new("t")
            .with_column(Column::new("a", "int"))
            .unwrap()
            .with_column(Column::new("b", "text"))
            .unwrap()
            .finalized();
        let b = Table::new("t")
            .with_column(Column::new("b", "text"))
            .unwrap()
            .with_column(Column::new("a", "integer(11)"))
            .unwrap()
            .finalized();
        assert!(a.is_similar(&b, &dialect));
        let c = b.clone().with_attribute("engine", "MyISAM");
        assert!(!a.is_similar(&c, &dialect));
        let d = b.with_attribute("ENGINE", "innodb");
        assert!(a.is_similar(&d, &dialect));
    }
}

//! Declarative class descriptions.
//!
//! A [`ClassDeclaration`] is what application code supplies for each mapped
//! class; [`crate::class::ClassBase`] derives the full metadata from it.
//! Declarations deserialize from JSON through serde.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use zesk_schema::SqlValue;

use crate::member::MemberType;

/// How a class names its id column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IdColumn {
    /// Use the registry's default id column when no primary keys are declared.
    #[default]
    Automatic,
    /// The class has no id column.
    None,
    /// A named id column.
    Named(String),
}

impl From<String> for IdColumn {
    fn from(value: String) -> Self {
        match value.as_str() {
            "*" => Self::Automatic,
            "" => Self::None,
            _ => Self::Named(value),
        }
    }
}

impl From<IdColumn> for String {
    fn from(value: IdColumn) -> Self {
        match value {
            IdColumn::Automatic => Self::from("*"),
            IdColumn::None => Self::new(),
            IdColumn::Named(name) => name,
        }
    }
}

impl fmt::Display for IdColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automatic => f.write_str("*"),
            Self::None => Ok(()),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A has-many relationship as declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HasManySpec {
    /// Target class. Required.
    pub class: String,
    /// Link table for many-to-many relations. `{table}` expands to the owner's table.
    pub table: Option<String>,
    /// Class whose table is the link table.
    pub link_class: Option<String>,
    /// Column referencing the owner. Defaults to the owner's class name.
    pub foreign_key: Option<String>,
    /// Link table column referencing the target.
    pub far_key: Option<String>,
    /// Ordering applied to member queries, unprefixed.
    pub order_by: Vec<String>,
    /// Extra equality predicates applied to member queries.
    #[serde(rename = "where")]
    pub conditions: IndexMap<String, SqlValue>,
    /// Extra equality conditions added to the generated join.
    pub on: IndexMap<String, SqlValue>,
    /// Marks the default has-many member for its target class.
    pub default: bool,
}

impl HasManySpec {
    /// Creates a direct has-many on `class`.
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Self::default()
        }
    }

    /// Sets the link table.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the link class.
    #[must_use]
    pub fn link_class(mut self, class: impl Into<String>) -> Self {
        self.link_class = Some(class.into());
        self
    }

    /// Sets the foreign key.
    #[must_use]
    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = Some(column.into());
        self
    }

    /// Sets the far key.
    #[must_use]
    pub fn far_key(mut self, column: impl Into<String>) -> Self {
        self.far_key = Some(column.into());
        self
    }

    /// Appends an ORDER BY term.
    #[must_use]
    pub fn order_by(mut self, term: impl Into<String>) -> Self {
        self.order_by.push(term.into());
        self
    }

    /// Adds a WHERE equality.
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.conditions.insert(column.into(), value.into());
        self
    }

    /// Adds a join ON equality.
    #[must_use]
    pub fn on(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.on.insert(column.into(), value.into());
        self
    }

    /// Marks this member as the default for its target class.
    #[must_use]
    pub const fn default_member(mut self) -> Self {
        self.default = true;
        self
    }
}

/// A mapped class as declared by application code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDeclaration {
    /// Class name.
    pub class: String,
    /// Human readable name. Defaults to the class name.
    pub name: Option<String>,
    /// Name used to derive the table. Defaults to the class name.
    pub code_name: Option<String>,
    /// Explicit table name.
    pub table: Option<String>,
    /// Id column rule.
    pub id_column: IdColumn,
    /// Primary key columns.
    pub primary_keys: Vec<String>,
    /// Auto-increment column.
    pub auto_column: Option<String>,
    /// Columns used to look up existing rows. Defaults to the primary keys.
    pub find_keys: Vec<String>,
    /// Column name to member type name.
    pub column_types: IndexMap<String, String>,
    /// Member name to target class; a `*member` target reads the class from another member.
    pub has_one: IndexMap<String, String>,
    /// Member name to has-many relationship.
    pub has_many: IndexMap<String, HasManySpec>,
    /// Polymorphic base class.
    pub polymorphic: Option<String>,
    /// Member a `crc32` column checksums.
    pub crc_column: Option<String>,
    /// CREATE TABLE SQL with `{placeholder}`s from the schema map.
    pub schema: Option<String>,
}

impl ClassDeclaration {
    /// Creates an empty declaration for `class`.
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Self::default()
        }
    }

    /// Sets the table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the code name.
    #[must_use]
    pub fn code_name(mut self, code_name: impl Into<String>) -> Self {
        self.code_name = Some(code_name.into());
        self
    }

    /// Sets the id column rule.
    #[must_use]
    pub fn id_column(mut self, id_column: IdColumn) -> Self {
        self.id_column = id_column;
        self
    }

    /// Sets the primary keys.
    #[must_use]
    pub fn primary_keys(mut self, keys: &[&str]) -> Self {
        self.primary_keys = keys.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets the auto-increment column.
    #[must_use]
    pub fn auto_column(mut self, column: impl Into<String>) -> Self {
        self.auto_column = Some(column.into());
        self
    }

    /// Sets the find keys.
    #[must_use]
    pub fn find_keys(mut self, keys: &[&str]) -> Self {
        self.find_keys = keys.iter().map(ToString::to_string).collect();
        self
    }

    /// Declares a column with a member type.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, member_type: MemberType) -> Self {
        self.column_types
            .insert(name.into(), member_type.as_str().to_string());
        self
    }

    /// Declares a has-one member.
    #[must_use]
    pub fn has_one(mut self, member: impl Into<String>, target: impl Into<String>) -> Self {
        self.has_one.insert(member.into(), target.into());
        self
    }

    /// Declares a has-many member.
    #[must_use]
    pub fn has_many(mut self, member: impl Into<String>, spec: HasManySpec) -> Self {
        self.has_many.insert(member.into(), spec);
        self
    }

    /// Sets the polymorphic base class.
    #[must_use]
    pub fn polymorphic(mut self, base: impl Into<String>) -> Self {
        self.polymorphic = Some(base.into());
        self
    }

    /// Sets the member checksummed by `crc32` columns.
    #[must_use]
    pub fn crc_column(mut self, member: impl Into<String>) -> Self {
        self.crc_column = Some(member.into());
        self
    }

    /// Sets the CREATE TABLE SQL.
    #[must_use]
    pub fn schema(mut self, sql: impl Into<String>) -> Self {
        self.schema = Some(sql.into());
        self
    }
}

/// A file of class declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclarationFile {
    /// Prefix applied to derived table names.
    pub table_prefix: String,
    /// Declared classes.
    pub classes: Vec<ClassDeclaration>,
}

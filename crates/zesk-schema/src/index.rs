//! Index model.

use std::fmt;

use crate::dialect::SchemaDialect;

/// Canonical name of a table's primary index.
pub const PRIMARY_INDEX: &str = "primary";

/// Index type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// Non-unique index.
    Index,
    /// Unique index.
    Unique,
    /// Primary key.
    Primary,
}

impl IndexType {
    /// Maps a loose type name onto an index type; unknown names are plain indexes.
    #[must_use]
    pub fn determine(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "unique" | "unique key" | "unique index" => Self::Unique,
            "primary" | "primary key" => Self::Primary,
            _ => Self::Index,
        }
    }

    /// Returns the SQL keyword for the type.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Index => "INDEX",
            Self::Unique => "UNIQUE",
            Self::Primary => "PRIMARY KEY",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Physical index structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexStructure {
    /// B-tree.
    BTree,
    /// Hash.
    Hash,
}

impl IndexStructure {
    /// Parses `BTREE` or `HASH`, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "BTREE" => Some(Self::BTree),
            "HASH" => Some(Self::Hash),
            _ => None,
        }
    }

    /// Returns the SQL keyword for the structure.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::BTree => "BTREE",
            Self::Hash => "HASH",
        }
    }
}

/// One column of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    /// Column name.
    pub name: String,
    /// Prefix length, `None` for the whole column.
    pub size: Option<u32>,
}

/// A named index over an ordered list of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Owning table.
    pub table: String,
    /// Index name, always [`PRIMARY_INDEX`] for primary keys.
    pub name: String,
    /// Index type.
    pub kind: IndexType,
    /// Structure, `None` for the database default.
    pub structure: Option<IndexStructure>,
    /// Columns in declared order.
    pub columns: Vec<IndexColumn>,
}

impl Index {
    /// Creates an empty index.
    #[must_use]
    pub fn new(table: impl Into<String>, name: impl Into<String>, kind: IndexType) -> Self {
        let name = match kind {
            IndexType::Primary => String::from(PRIMARY_INDEX),
            _ => name.into(),
        };
        Self {
            table: table.into(),
            name,
            kind,
            structure: None,
            columns: Vec::new(),
        }
    }

    /// Creates a primary index.
    #[must_use]
    pub fn primary(table: impl Into<String>) -> Self {
        Self::new(table, PRIMARY_INDEX, IndexType::Primary)
    }

    /// Adds a whole column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.add_column(name, None);
        self
    }

    /// Adds a column prefix.
    #[must_use]
    pub fn column_sized(mut self, name: impl Into<String>, size: u32) -> Self {
        self.add_column(name, Some(size));
        self
    }

    /// Sets the structure.
    #[must_use]
    pub const fn with_structure(mut self, structure: IndexStructure) -> Self {
        self.structure = Some(structure);
        self
    }

    /// Appends a column, or updates its size when already present.
    pub fn add_column(&mut self, name: impl Into<String>, size: Option<u32>) {
        let name = name.into();
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == name) {
            existing.size = size;
        } else {
            self.columns.push(IndexColumn { name, size });
        }
    }

    /// Returns true when the index covers `column`.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }

    /// Column names in declared order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Returns true for the primary index.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.kind == IndexType::Primary
    }

    /// Structure, falling back to the database default for this index type.
    #[must_use]
    pub fn resolved_structure(&self, dialect: &dyn SchemaDialect) -> IndexStructure {
        self.structure
            .unwrap_or_else(|| dialect.default_index_structure(self.kind))
    }

    /// Returns true when both indexes cover the same columns, ignoring order.
    #[must_use]
    pub fn same_columns(&self, that: &Self) -> bool {
        let mut mine: Vec<_> = self.columns.iter().map(|c| (&c.name, c.size)).collect();
        let mut theirs: Vec<_> = that.columns.iter().map(|c| (&c.name, c.size)).collect();
        mine.sort();
        theirs.sort();
        mine == theirs
    }

    /// Compares type, structure, table, name and the ordered column list.
    ///
    /// Column order is significant: `(a, b)` is not similar to `(b, a)`.
    #[must_use]
    pub fn is_similar(&self, that: &Self, dialect: &dyn SchemaDialect) -> bool {
        self.kind == that.kind
            && self.resolved_structure(dialect) == that.resolved_structure(dialect)
            && self.table.eq_ignore_ascii_case(&that.table)
            && self.name == that.name
            && self.columns.len() == that.columns.len()
            && self.columns == that.columns
    }
}

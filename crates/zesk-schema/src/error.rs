//! Error types for the schema models and differ.

/// Errors raised while building table snapshots or computing schema diffs.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A column lookup failed.
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// Table searched.
        table: String,
        /// Missing column.
        column: String,
    },

    /// An index lookup failed.
    #[error("Index '{index}' not found in table '{table}'")]
    IndexNotFound {
        /// Table searched.
        table: String,
        /// Missing index.
        index: String,
    },

    /// A column with this name was already added to the table.
    #[error("Column '{column}' already exists in table '{table}'")]
    DuplicateColumn {
        /// Owning table.
        table: String,
        /// Duplicated column.
        column: String,
    },

    /// An index with this name was already attached to the table.
    #[error("Index '{index}' already exists in table '{table}'")]
    DuplicateIndex {
        /// Owning table.
        table: String,
        /// Duplicated index.
        index: String,
    },

    /// A column has no SQL type, so no DDL can be generated for it.
    #[error("Column '{column}' in table '{table}' has no SQL type")]
    MissingSqlType {
        /// Owning table.
        table: String,
        /// Typeless column.
        column: String,
    },

    /// The differ was handed snapshots of two different tables.
    #[error("Cannot diff declared table '{declared}' against live table '{live}'")]
    TableMismatch {
        /// Declared table name.
        declared: String,
        /// Live table name.
        live: String,
    },

    /// The table does not exist in the live database.
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// A schema script could not be parsed.
    #[error("Parse error at byte {position}: {message}")]
    Parse {
        /// What went wrong.
        message: String,
        /// Byte offset in the script.
        position: usize,
    },

    /// A structurally invalid request.
    #[error("{0}")]
    Semantics(String),

    /// IO error while reading schema scripts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// Returns true when the error signals a missing live table.
    #[must_use]
    pub const fn is_table_not_found(&self) -> bool {
        matches!(self, Self::TableNotFound(_))
    }
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

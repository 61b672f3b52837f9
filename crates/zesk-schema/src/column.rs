//! Column model.

use std::fmt;

use indexmap::IndexMap;

use crate::index::{IndexType, PRIMARY_INDEX};
use crate::types::TypeMap;
use crate::value::SqlValue;

/// A column's declared membership in a named index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMembership {
    /// Index name.
    pub name: String,
    /// Index type.
    pub kind: IndexType,
    /// Prefix length, `None` for the whole column.
    pub size: Option<u32>,
}

/// Attributes compared by [`Column::differences`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnField {
    /// Native SQL type.
    Type,
    /// Binary collation flag.
    Binary,
    /// NOT NULL, after applying the primary key fallback.
    Required,
    /// Normalized default value.
    Default,
    /// Unsigned flag.
    Unsigned,
    /// Auto-increment flag.
    Increment,
}

impl fmt::Display for ColumnField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Type => "type",
            Self::Binary => "binary",
            Self::Required => "required",
            Self::Default => "default",
            Self::Unsigned => "unsigned",
            Self::Increment => "increment",
        })
    }
}

/// Field-by-field differences between two columns, in comparison order.
///
/// Each entry holds `(this, that)` rendered for diagnostics.
pub type ColumnDifferences = IndexMap<ColumnField, (String, String)>;

/// A table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Lowercased native type, e.g. `int(11)`.
    pub sql_type: Option<String>,
    /// Explicit NOT NULL / NULL.
    pub not_null: Option<bool>,
    /// Explicit required flag, takes precedence over `not_null`.
    pub required: Option<bool>,
    /// Default value.
    pub default: Option<SqlValue>,
    /// Unsigned numeric.
    pub unsigned: bool,
    /// Binary collation.
    pub binary: bool,
    /// Member of the table's primary index.
    pub primary_key: bool,
    /// Auto-increment / serial.
    pub increment: bool,
    /// Name the column had before a rename.
    pub previous_name: Option<String>,
    /// Character set for text columns.
    pub charset: Option<String>,
    /// Collation for text columns.
    pub collation: Option<String>,
    /// Column comment.
    pub comment: Option<String>,
    /// Declared index memberships, in declaration order.
    pub indexes: Vec<IndexMembership>,
}

impl Column {
    /// Creates a nullable column of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            sql_type: Some(sql_type.into().to_lowercase()),
            ..Self::untyped(name)
        }
    }

    /// Creates a column with no SQL type yet.
    #[must_use]
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: None,
            not_null: None,
            required: None,
            default: None,
            unsigned: false,
            binary: false,
            primary_key: false,
            increment: false,
            previous_name: None,
            charset: None,
            collation: None,
            comment: None,
            indexes: Vec::new(),
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = Some(true);
        self
    }

    /// Marks the column explicitly NULL.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.not_null = Some(false);
        self
    }

    /// Sets the required flag.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<SqlValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the column unsigned.
    #[must_use]
    pub const fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Marks the column binary.
    #[must_use]
    pub const fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    /// Marks the column auto-increment.
    #[must_use]
    pub const fn increment(mut self) -> Self {
        self.increment = true;
        self
    }

    /// Makes the column part of the primary index.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.add_membership(IndexType::Primary, PRIMARY_INDEX, None);
        self
    }

    /// Records the column's previous name for rename detection.
    #[must_use]
    pub fn previous_name(mut self, name: impl Into<String>) -> Self {
        self.previous_name = Some(name.into());
        self
    }

    /// Sets the character set.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Adds the column to a unique index. An empty name yields `<column>_Unique`.
    #[must_use]
    pub fn unique(mut self, name: &str) -> Self {
        self.add_membership(IndexType::Unique, name, None);
        self
    }

    /// Adds the column to a plain index. An empty name yields `<column>_Index`.
    #[must_use]
    pub fn index(mut self, name: &str) -> Self {
        self.add_membership(IndexType::Index, name, None);
        self
    }

    /// Adds the column to an index with a prefix length.
    #[must_use]
    pub fn index_sized(mut self, kind: IndexType, name: &str, size: u32) -> Self {
        self.add_membership(kind, name, Some(size));
        self
    }

    /// Records an index membership, naming it after the column when unnamed.
    pub fn add_membership(&mut self, kind: IndexType, name: &str, size: Option<u32>) {
        let name = match (kind, name.is_empty()) {
            (IndexType::Primary, _) => String::from(PRIMARY_INDEX),
            (IndexType::Unique, true) => format!("{}_Unique", self.name),
            (IndexType::Index, true) => format!("{}_Index", self.name),
            (_, false) => name.to_string(),
        };
        if kind == IndexType::Primary {
            self.primary_key = true;
            self.required.get_or_insert(true);
        }
        if let Some(existing) = self.indexes.iter_mut().find(|m| m.name == name) {
            existing.kind = kind;
            existing.size = size;
            return;
        }
        self.indexes.push(IndexMembership { name, kind, size });
    }

    /// Returns the native type, or an empty string when untyped.
    #[must_use]
    pub fn sql_type(&self) -> &str {
        self.sql_type.as_deref().unwrap_or_default()
    }

    /// Effective NOT NULL: explicit required, else NOT NULL, else primary key.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required.or(self.not_null).unwrap_or(self.primary_key)
    }

    /// Returns the differences between this column and `that`.
    ///
    /// An empty result means the columns are equivalent for DDL purposes.
    #[must_use]
    pub fn differences(&self, that: &Self, types: &TypeMap) -> ColumnDifferences {
        let mut diffs = ColumnDifferences::new();
        if !types.types_equal(self.sql_type(), that.sql_type()) {
            diffs.insert(
                ColumnField::Type,
                (self.sql_type().to_string(), that.sql_type().to_string()),
            );
        }
        flag(&mut diffs, ColumnField::Binary, self.binary, that.binary);
        flag(&mut diffs, ColumnField::Required, self.is_required(), that.is_required());
        let this_default =
            types.normalize_default(self.sql_type(), self.default.as_ref(), self.is_required());
        let that_default =
            types.normalize_default(that.sql_type(), that.default.as_ref(), that.is_required());
        if this_default != that_default {
            diffs.insert(
                ColumnField::Default,
                (describe(this_default.as_ref()), describe(that_default.as_ref())),
            );
        }
        if types.supports_unsigned() {
            flag(&mut diffs, ColumnField::Unsigned, self.unsigned, that.unsigned);
        }
        flag(&mut diffs, ColumnField::Increment, self.increment, that.increment);
        diffs
    }

    /// Returns true when the columns are equivalent for DDL purposes.
    #[must_use]
    pub fn is_similar(&self, that: &Self, types: &TypeMap) -> bool {
        self.differences(that, types).is_empty()
    }
}

fn flag(diffs: &mut ColumnDifferences, field: ColumnField, this: bool, that: bool) {
    if this != that {
        diffs.insert(field, (this.to_string(), that.to_string()));
    }
}

fn describe(value: Option<&SqlValue>) -> String {
    value.map_or_else(|| String::from("none"), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_falls_back_to_primary_key() {
        let id = Column::new("id", "int(11)").primary_key();
        assert!(id.is_required());
        let explicit = Column::new("id", "int(11)").primary_key().required(false);
        assert!(!explicit.is_required());
        let nullable = Column::new("name", "varchar(32)");
        assert!(!nullable.is_required());
        assert!(nullable.clone().not_null().is_required());
    }

    #[test]
    fn test_unnamed_memberships() {
        let col = Column::new("Email", "varchar(128)").unique("").index("");
        let names: Vec<_> = col.indexes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Email_Unique", "Email_Index"]);
    }

    #[test]
    fn test_int_vs_integer_no_difference() {
        let types = TypeMap::mysql();
        let a = Column::new("id", "int").not_null();
        let b = Column::new("id", "integer(12)").not_null();
        assert!(a.differences(&b, &types).is_empty());
    }

    #[test]
    fn test_type_and_null_differences_in_order() {
        let types = TypeMap::mysql();
        let declared = Column::new("created", "timestamp").nullable();
        let live = Column::new("created", "datetime").not_null();
        let diffs = declared.differences(&live, &types);
        let fields: Vec<_> = diffs.keys().copied().collect();
        assert_eq!(fields, vec![ColumnField::Type, ColumnField::Required]);
        assert_eq!(
            diffs[&ColumnField::Type],
            (String::from("timestamp"), String::from("datetime"))
        );
    }

    #[test]
    fn test_implicit_default_matches_explicit_zero() {
        let types = TypeMap::mysql();
        let declared = Column::new("Status", "smallint(1)").not_null();
        let live = Column::new("Status", "smallint(1)")
            .not_null()
            .default_value("0");
        assert!(declared.is_similar(&live, &types));
        let other = Column::new("Status", "smallint(1)").not_null().default_value(1_i64);
        assert_eq!(
            declared.differences(&other, &types)[&ColumnField::Default],
            (String::from("0"), String::from("1"))
        );
    }

    #[test]
    fn test_increment_and_unsigned() {
        let types = TypeMap::mysql();
        let a = Column::new("id", "int(11)").unsigned().increment();
        let b = Column::new("id", "int(11)");
        let diffs = a.differences(&b, &types);
        assert!(diffs.contains_key(&ColumnField::Unsigned));
        assert!(diffs.contains_key(&ColumnField::Increment));
    }

    #[test]
    fn test_unsigned_ignored_without_vendor_support() {
        let types = TypeMap::postgres();
        let declared = Column::new("id", "int(11)").unsigned().increment().primary_key();
        let live = Column::new("id", "serial").increment().not_null();
        assert!(declared.differences(&live, &types).is_empty());
        assert!(!declared.is_similar(&live, &TypeMap::mysql()));
    }
}

//! Native SQL type rules.
//!
//! Vendor type names are grouped into classes, and two declarations are
//! compared by class first. The tables are plain data so a dialect can
//! describe its own types without new comparison code.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::value::SqlValue;

static NATIVE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([a-z_]+)(?:\s*\(([^)]*)\))?").expect("Invalid native type regex")
});

/// Zero datetime used when a timestamp default is `0`.
pub const ZERO_DATETIME: &str = "0000-00-00 00:00:00";

/// Broad family a native type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// Character data.
    String,
    /// Whole numbers.
    Integer,
    /// Fractional numbers.
    Double,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    DateTime,
    /// Binary data.
    Blob,
    /// True/false.
    Boolean,
}

impl TypeClass {
    /// Classes where only the base name matters, display sizes are ignored.
    #[must_use]
    pub const fn ignores_size(self) -> bool {
        matches!(self, Self::Integer | Self::Date | Self::Time | Self::DateTime)
    }
}

/// A parsed native type such as `varchar(32)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeType {
    /// Lowercased base name, aliases applied.
    pub base: String,
    /// Argument text with whitespace removed, if any.
    pub size: Option<String>,
}

/// Data tables describing a vendor's native types.
#[derive(Debug, Clone)]
pub struct TypeMap {
    aliases: HashMap<&'static str, &'static str>,
    classes: HashMap<&'static str, TypeClass>,
    unsigned: bool,
}

const MYSQL_ALIASES: &[(&str, &str)] = &[
    ("int", "integer"),
    ("bool", "tinyint"),
    ("boolean", "tinyint"),
];

const MYSQL_CLASSES: &[(TypeClass, &[&str])] = &[
    (
        TypeClass::String,
        &["char", "varchar", "text", "tinytext", "mediumtext", "longtext", "enum", "set"],
    ),
    (
        TypeClass::Integer,
        &["integer", "bit", "tinyint", "smallint", "mediumint", "bigint"],
    ),
    (TypeClass::Double, &["decimal", "numeric", "float", "double", "real"]),
    (TypeClass::Date, &["date"]),
    (TypeClass::Time, &["time"]),
    (TypeClass::DateTime, &["datetime"]),
    (
        TypeClass::Blob,
        &["blob", "tinyblob", "mediumblob", "longblob", "binary", "varbinary"],
    ),
];

const POSTGRES_ALIASES: &[(&str, &str)] = &[
    ("int", "integer"),
    ("int4", "integer"),
    ("int2", "smallint"),
    ("int8", "bigint"),
    ("serial", "integer"),
    ("bigserial", "bigint"),
    ("bool", "boolean"),
    ("float4", "real"),
    ("float8", "double"),
    ("character", "char"),
    ("bpchar", "char"),
    ("timestamptz", "timestamp"),
];

const POSTGRES_CLASSES: &[(TypeClass, &[&str])] = &[
    (TypeClass::String, &["char", "varchar", "text"]),
    (TypeClass::Integer, &["integer", "smallint", "bigint"]),
    (TypeClass::Double, &["decimal", "numeric", "real", "double"]),
    (TypeClass::Date, &["date"]),
    (TypeClass::Time, &["time"]),
    (TypeClass::DateTime, &["timestamp"]),
    (TypeClass::Blob, &["bytea"]),
    (TypeClass::Boolean, &["boolean"]),
];

impl TypeMap {
    /// Builds a type map from alias and class tables.
    #[must_use]
    pub fn new(
        aliases: &[(&'static str, &'static str)],
        classes: &[(TypeClass, &[&'static str])],
    ) -> Self {
        Self {
            aliases: aliases.iter().copied().collect(),
            classes: classes
                .iter()
                .flat_map(|(class, names)| names.iter().map(move |name| (*name, *class)))
                .collect(),
            unsigned: true,
        }
    }

    /// Marks the vendor as having no unsigned numeric types.
    #[must_use]
    pub const fn without_unsigned(mut self) -> Self {
        self.unsigned = false;
        self
    }

    /// Returns true when numeric columns can be declared unsigned.
    #[must_use]
    pub const fn supports_unsigned(&self) -> bool {
        self.unsigned
    }

    /// MySQL type rules.
    #[must_use]
    pub fn mysql() -> Self {
        Self::new(MYSQL_ALIASES, MYSQL_CLASSES)
    }

    /// PostgreSQL type rules.
    #[must_use]
    pub fn postgres() -> Self {
        Self::new(POSTGRES_ALIASES, POSTGRES_CLASSES).without_unsigned()
    }

    /// Parses a raw type into base name and size, resolving aliases.
    #[must_use]
    pub fn native_type(&self, sql_type: &str) -> NativeType {
        let lower = sql_type.to_lowercase();
        let (base, size) = NATIVE_TYPE.captures(&lower).map_or_else(
            || (lower.trim().to_string(), None),
            |caps| {
                let base = caps.get(1).map_or("", |m| m.as_str()).to_string();
                let size = caps
                    .get(2)
                    .map(|m| m.as_str().chars().filter(|c| !c.is_whitespace()).collect());
                (base, size)
            },
        );
        let base = self
            .aliases
            .get(base.as_str())
            .map_or(base, |alias| (*alias).to_string());
        NativeType { base, size }
    }

    /// Returns the class of a raw type, or `None` when the base is unknown.
    #[must_use]
    pub fn class_of(&self, sql_type: &str) -> Option<TypeClass> {
        self.classes.get(self.native_type(sql_type).base.as_str()).copied()
    }

    /// Returns true when the type holds character data.
    #[must_use]
    pub fn is_text(&self, sql_type: &str) -> bool {
        self.class_of(sql_type) == Some(TypeClass::String)
    }

    /// Returns true when the type can never carry a default value.
    #[must_use]
    pub fn forbids_default(&self, sql_type: &str) -> bool {
        let native = self.native_type(sql_type);
        native.base.ends_with("text")
            || self.classes.get(native.base.as_str()) == Some(&TypeClass::Blob)
    }

    /// Compares two raw types for DDL purposes.
    ///
    /// `int` and `integer(12)` are equal, `datetime` and `timestamp` are not,
    /// and `varchar(32)` differs from `varchar(64)`.
    #[must_use]
    pub fn types_equal(&self, a: &str, b: &str) -> bool {
        let a = self.native_type(a);
        let b = self.native_type(b);
        let class_a = self.classes.get(a.base.as_str());
        let class_b = self.classes.get(b.base.as_str());
        if class_a != class_b {
            return false;
        }
        match class_a {
            Some(class) if class.ignores_size() => a.base == b.base,
            _ => a.base == b.base && a.size == b.size,
        }
    }

    /// Normalizes a default value the way the database would store it.
    ///
    /// A required column without an explicit default is given the implicit
    /// default of its class, so a declared column and its live counterpart
    /// compare equal.
    #[must_use]
    pub fn normalize_default(
        &self,
        sql_type: &str,
        default: Option<&SqlValue>,
        required: bool,
    ) -> Option<SqlValue> {
        if self.forbids_default(sql_type) {
            return None;
        }
        let native = self.native_type(sql_type);
        let class = self.classes.get(native.base.as_str()).copied();
        let Some(value) = default.filter(|value| !value.is_null()) else {
            if !required {
                return None;
            }
            return match class {
                Some(TypeClass::Integer) => Some(SqlValue::Int(0)),
                Some(TypeClass::Double) => Some(SqlValue::Float(0.0)),
                Some(TypeClass::String) => Some(SqlValue::Text(String::new())),
                Some(TypeClass::Boolean) => Some(SqlValue::Bool(false)),
                _ => None,
            };
        };
        if let SqlValue::Expression(expr) = value {
            return Some(SqlValue::Expression(expr.to_uppercase()));
        }
        match class {
            Some(TypeClass::Integer) => value.to_int().map(SqlValue::Int),
            Some(TypeClass::Double) => value.to_float().map(SqlValue::Float),
            Some(TypeClass::Boolean) => value.to_int().map(|n| SqlValue::Bool(n != 0)),
            Some(TypeClass::DateTime) => Some(temporal_default(value)),
            None if native.base == "timestamp" => Some(temporal_default(value)),
            _ => value.as_text().map(SqlValue::Text),
        }
    }
}

fn temporal_default(value: &SqlValue) -> SqlValue {
    match value {
        SqlValue::Int(0) => SqlValue::Text(String::from(ZERO_DATETIME)),
        SqlValue::Text(s) if s == "0" => SqlValue::Text(String::from(ZERO_DATETIME)),
        SqlValue::Text(s) if s.eq_ignore_ascii_case("current_timestamp") => {
            SqlValue::Expression(String::from("CURRENT_TIMESTAMP"))
        }
        other => other.as_text().map_or(SqlValue::Null, SqlValue::Text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_aliases_integer_with_size() {
        let types = TypeMap::mysql();
        assert!(types.types_equal("int", "integer(12)"));
        assert!(types.types_equal("INT(11)", "int(10)"));
        assert!(types.types_equal("tinyint(1)", "boolean"));
    }

    #[test]
    fn test_datetime_is_not_timestamp() {
        let types = TypeMap::mysql();
        assert!(!types.types_equal("datetime", "timestamp"));
        assert!(types.types_equal("timestamp", "TIMESTAMP"));
    }

    #[test]
    fn test_string_sizes_matter() {
        let types = TypeMap::mysql();
        assert!(!types.types_equal("varchar(32)", "varchar(64)"));
        assert!(types.types_equal("varchar( 32 )", "varchar(32)"));
        assert!(!types.types_equal("varchar(32)", "char(32)"));
        assert!(!types.types_equal("text", "mediumtext"));
    }

    #[test]
    fn test_decimal_precision_matters() {
        let types = TypeMap::mysql();
        assert!(types.types_equal("decimal(10,2)", "decimal(10, 2)"));
        assert!(!types.types_equal("decimal(10,2)", "decimal(12,2)"));
    }

    #[test]
    fn test_postgres_aliases() {
        let types = TypeMap::postgres();
        assert!(types.types_equal("int4", "integer"));
        assert!(types.types_equal("serial", "int"));
        assert_eq!(types.class_of("timestamptz"), Some(TypeClass::DateTime));
    }

    #[test]
    fn test_native_type_parse() {
        let types = TypeMap::mysql();
        let native = types.native_type("int(11) unsigned");
        assert_eq!(native.base, "integer");
        assert_eq!(native.size.as_deref(), Some("11"));
        assert_eq!(types.native_type("text").size, None);
    }

    #[test]
    fn test_default_normalization() {
        let types = TypeMap::mysql();
        assert_eq!(
            types.normalize_default("smallint(1)", Some(&SqlValue::Text(String::from("0"))), true),
            Some(SqlValue::Int(0))
        );
        assert_eq!(types.normalize_default("int(11)", None, true), Some(SqlValue::Int(0)));
        assert_eq!(types.normalize_default("int(11)", None, false), None);
        assert_eq!(
            types.normalize_default("text", Some(&SqlValue::Text(String::from("x"))), false),
            None
        );
        assert_eq!(
            types.normalize_default("timestamp", Some(&SqlValue::Int(0)), true),
            Some(SqlValue::Text(String::from(ZERO_DATETIME)))
        );
        assert_eq!(
            types.normalize_default(
                "timestamp",
                Some(&SqlValue::Text(String::from("current_timestamp"))),
                true
            ),
            Some(SqlValue::Expression(String::from("CURRENT_TIMESTAMP")))
        );
        assert_eq!(
            types.normalize_default("double", Some(&SqlValue::Text(String::from("1.5"))), false),
            Some(SqlValue::Float(1.5))
        );
    }
}

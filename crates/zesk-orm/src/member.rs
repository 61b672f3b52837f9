//! Semantic member types.
//!
//! Every mapped column carries a semantic type that decides how values are
//! coerced to and from the database and which SQL type a synthesized table
//! uses for it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OrmError;

/// Semantic type of a class member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    /// Integer identifier.
    Id,
    /// Long text.
    Text,
    /// Short text.
    String,
    /// Polymorphic class discriminator.
    Polymorph,
    /// Reference to another object, stored as its id.
    #[serde(rename = "orm", alias = "object")]
    Object,
    /// Set to the current time on insert.
    Created,
    /// Set to the current time on every write.
    Modified,
    /// Serialized structure.
    Serialize,
    /// JSON document.
    Json,
    /// Integer.
    Integer,
    /// Single character.
    Character,
    /// Floating point.
    Real,
    /// Floating point.
    Float,
    /// Floating point.
    Double,
    /// Fixed point, handled as floating point.
    Decimal,
    /// Small integer modulo 255.
    Byte,
    /// Raw bytes.
    Binary,
    /// Boolean stored as 1/0.
    Boolean,
    /// Date and time.
    Timestamp,
    /// Date and time.
    Datetime,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// IPv4 address stored as an integer.
    Ip,
    /// IPv4 address stored as an integer.
    Ip4,
    /// CRC32 checksum of another member.
    Crc32,
    /// Hex string stored as bytes.
    Hex,
}

impl MemberType {
    /// Every member type, in declaration order.
    pub const ALL: [Self; 26] = [
        Self::Id,
        Self::Text,
        Self::String,
        Self::Polymorph,
        Self::Object,
        Self::Created,
        Self::Modified,
        Self::Serialize,
        Self::Json,
        Self::Integer,
        Self::Character,
        Self::Real,
        Self::Float,
        Self::Double,
        Self::Decimal,
        Self::Byte,
        Self::Binary,
        Self::Boolean,
        Self::Timestamp,
        Self::Datetime,
        Self::Date,
        Self::Time,
        Self::Ip,
        Self::Ip4,
        Self::Crc32,
        Self::Hex,
    ];

    /// Declaration name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Text => "text",
            Self::String => "string",
            Self::Polymorph => "polymorph",
            Self::Object => "orm",
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Serialize => "serialize",
            Self::Json => "json",
            Self::Integer => "integer",
            Self::Character => "character",
            Self::Real => "real",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Byte => "byte",
            Self::Binary => "binary",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Datetime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
            Self::Ip => "ip",
            Self::Ip4 => "ip4",
            Self::Crc32 => "crc32",
            Self::Hex => "hex",
        }
    }

    /// Parses a declared type name for `column`.
    pub fn parse(column: &str, name: &str) -> Result<Self, OrmError> {
        name.parse().map_err(|_| OrmError::InvalidColumnType {
            column: column.to_string(),
            type_name: name.to_string(),
        })
    }

    /// MySQL column type used when a table is synthesized from members.
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Id | Self::Object | Self::Integer => "int(11)",
            Self::Ip | Self::Ip4 | Self::Crc32 => "int(10)",
            Self::Byte => "tinyint(3)",
            Self::Boolean => "tinyint(1)",
            Self::Text | Self::Serialize | Self::Json => "text",
            Self::String => "varchar(255)",
            Self::Polymorph => "varchar(64)",
            Self::Character => "char(1)",
            Self::Real | Self::Float | Self::Double => "double",
            Self::Decimal => "decimal(12,2)",
            Self::Binary => "blob",
            Self::Hex => "varbinary(32)",
            Self::Created | Self::Modified | Self::Timestamp => "timestamp",
            Self::Datetime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
        }
    }

    /// Whether the synthesized column is unsigned.
    #[must_use]
    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::Id | Self::Object | Self::Ip | Self::Ip4 | Self::Crc32 | Self::Byte
        )
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower == "object" {
            return Ok(Self::Object);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| format!("unknown member type: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("Integer".parse::<MemberType>(), Ok(MemberType::Integer));
        assert_eq!("orm".parse::<MemberType>(), Ok(MemberType::Object));
        assert_eq!("object".parse::<MemberType>(), Ok(MemberType::Object));
        assert_eq!("boolean".parse::<MemberType>(), Ok(MemberType::Boolean));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = MemberType::parse("Size", "huge").unwrap_err();
        assert!(matches!(
            err,
            OrmError::InvalidColumnType { ref column, ref type_name }
                if column == "Size" && type_name == "huge"
        ));
    }

    #[test]
    fn test_names_are_unique() {
        for (i, a) in MemberType::ALL.iter().enumerate() {
            for b in &MemberType::ALL[i + 1..] {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
    }

    #[test]
    fn test_serde_names() {
        let t: MemberType = serde_json::from_str("\"ip4\"").unwrap();
        assert_eq!(t, MemberType::Ip4);
        assert_eq!(serde_json::to_string(&MemberType::Object).unwrap(), "\"orm\"");
    }
}

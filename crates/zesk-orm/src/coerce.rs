//! Member value coercion.
//!
//! A [`CoercionRegistry`] maps each [`MemberType`] to an encode/decode pair.
//! Encoding turns an in-memory [`MemberValue`] into an [`Assignment`] for an
//! INSERT or UPDATE; decoding turns a column value read from the database
//! back into a member value.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;
use zesk_schema::{SchemaDialect, SqlValue};

use crate::error::{OrmError, Result};
use crate::member::MemberType;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const SQL_NOW: &str = "NOW()";

/// In-memory value of a class member.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberValue {
    /// No value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer, also used for object ids.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Date and time, UTC.
    Timestamp(NaiveDateTime),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// IPv4 address.
    Ip(Ipv4Addr),
    /// Structured document.
    Json(serde_json::Value),
    /// The current time, resolved by the database.
    Now,
}

impl MemberValue {
    /// Loose emptiness: null, empty text, `"0"`, zero and `false`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Int(n) => *n == 0,
            Self::Float(f) => *f == 0.0,
            Self::Text(s) => s.is_empty() || s == "0",
            Self::Bytes(b) => b.is_empty(),
            Self::Json(v) => v.is_null(),
            Self::Timestamp(_) | Self::Date(_) | Self::Time(_) | Self::Ip(_) | Self::Now => false,
        }
    }

    /// Scalar form of the value, if it has one.
    #[must_use]
    pub fn to_sql_value(&self) -> Option<SqlValue> {
        match self {
            Self::Null => Some(SqlValue::Null),
            Self::Bool(b) => Some(SqlValue::Bool(*b)),
            Self::Int(n) => Some(SqlValue::Int(*n)),
            Self::Float(f) => Some(SqlValue::Float(*f)),
            Self::Text(s) => Some(SqlValue::Text(s.clone())),
            Self::Timestamp(t) => Some(SqlValue::Text(t.format(DATETIME_FORMAT).to_string())),
            Self::Date(d) => Some(SqlValue::Text(d.format(DATE_FORMAT).to_string())),
            Self::Time(t) => Some(SqlValue::Text(t.format(TIME_FORMAT).to_string())),
            Self::Ip(ip) => Some(SqlValue::Text(ip.to_string())),
            Self::Bytes(_) | Self::Json(_) | Self::Now => None,
        }
    }

    fn text(&self) -> Option<String> {
        self.to_sql_value().and_then(|v| v.as_text())
    }

    fn is_now(&self) -> bool {
        match self {
            Self::Now => true,
            Self::Text(s) => s.eq_ignore_ascii_case("now"),
            _ => false,
        }
    }

    /// Loose truthiness.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Text(s) => !matches!(
                s.trim().to_lowercase().as_str(),
                "" | "0" | "false" | "f" | "no" | "n" | "off" | "null"
            ),
            other => !other.is_empty(),
        }
    }
}

impl From<&str> for MemberValue {
    fn from(s: &str) -> Self {
        Self::Text(String::from(s))
    }
}

impl From<String> for MemberValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for MemberValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for MemberValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// How an encoded member is written.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// A bound value.
    Value(SqlValue),
    /// A raw SQL expression, written unquoted.
    Raw(String),
    /// The column is left out of the statement.
    Omit,
}

/// Per-write context passed to encoders.
pub struct EncodeContext<'a> {
    /// Dialect used to quote literals inside raw expressions.
    pub dialect: &'a dyn SchemaDialect,
    /// Whether the write is an INSERT.
    pub insert: bool,
    /// Class of the object being written.
    pub class_name: &'a str,
    /// Polymorphic base class, if any.
    pub polymorphic: Option<&'a str>,
    /// Value of the member a CRC32 column checksums.
    pub crc_source: Option<&'a str>,
}

/// Encodes a member value for writing.
pub type Encoder = fn(&MemberValue, &EncodeContext<'_>) -> Result<Assignment>;

/// Decodes a column value read from the database.
pub type Decoder = fn(&SqlValue) -> Result<MemberValue>;

/// Encode/decode pair for one member type.
#[derive(Debug, Clone, Copy)]
pub struct Coercion {
    /// Encoder.
    pub encode: Encoder,
    /// Decoder.
    pub decode: Decoder,
}

/// Table of coercions keyed by member type.
#[derive(Debug, Clone)]
pub struct CoercionRegistry {
    entries: HashMap<MemberType, Coercion>,
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CoercionRegistry {
    /// Creates the standard coercion table.
    #[must_use]
    pub fn new() -> Self {
        use MemberType as T;
        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.register_all(&[T::Id, T::Integer], encode_integer, decode_integer);
        registry.register_all(&[T::Text, T::String, T::Character], encode_text, decode_text);
        registry.register_all(
            &[T::Real, T::Float, T::Double, T::Decimal],
            encode_float,
            decode_float,
        );
        registry.register_all(&[T::Object], encode_object, decode_object);
        registry.register_all(&[T::Polymorph], encode_polymorph, decode_text);
        registry.register_all(&[T::Crc32], encode_crc32, decode_integer);
        registry.register_all(&[T::Hex], encode_hex, decode_hex);
        registry.register_all(&[T::Binary], encode_binary, decode_text);
        registry.register_all(&[T::Byte], encode_byte, decode_integer);
        registry.register_all(&[T::Boolean], encode_boolean, decode_boolean);
        registry.register_all(&[T::Serialize, T::Json], encode_json, decode_json);
        registry.register_all(&[T::Created], encode_created, decode_timestamp);
        registry.register_all(&[T::Modified], encode_modified, decode_timestamp);
        registry.register_all(&[T::Timestamp, T::Datetime], encode_timestamp, decode_timestamp);
        registry.register_all(&[T::Date], encode_date, decode_date);
        registry.register_all(&[T::Time], encode_time, decode_time);
        registry.register_all(&[T::Ip, T::Ip4], encode_ip, decode_ip);
        registry
    }

    fn register_all(&mut self, types: &[MemberType], encode: Encoder, decode: Decoder) {
        for member_type in types {
            self.register(*member_type, Coercion { encode, decode });
        }
    }

    /// Replaces the coercion for a member type.
    pub fn register(&mut self, member_type: MemberType, coercion: Coercion) {
        self.entries.insert(member_type, coercion);
    }

    fn get(&self, member_type: MemberType) -> Result<&Coercion> {
        self.entries
            .get(&member_type)
            .ok_or_else(|| OrmError::Semantics(format!("No coercion for type {member_type}")))
    }

    /// Encodes a member value.
    pub fn encode(
        &self,
        member_type: MemberType,
        value: &MemberValue,
        context: &EncodeContext<'_>,
    ) -> Result<Assignment> {
        (self.get(member_type)?.encode)(value, context)
    }

    /// Decodes a column value.
    pub fn decode(&self, member_type: MemberType, value: &SqlValue) -> Result<MemberValue> {
        (self.get(member_type)?.decode)(value)
    }
}

// ====================================================================
// Encoders
// ====================================================================

const fn value(v: SqlValue) -> Result<Assignment> {
    Ok(Assignment::Value(v))
}

fn encode_integer(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    match v {
        MemberValue::Null => value(SqlValue::Null),
        other => value(SqlValue::Int(loose_int(other))),
    }
}

fn encode_text(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    match v {
        MemberValue::Json(json) => value(SqlValue::Text(json.to_string())),
        other => value(other.text().map_or(SqlValue::Null, SqlValue::Text)),
    }
}

fn encode_float(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    match v {
        MemberValue::Null => value(SqlValue::Null),
        MemberValue::Text(s) if s.is_empty() => value(SqlValue::Null),
        other => value(SqlValue::Float(
            other.to_sql_value().and_then(|v| v.to_float()).unwrap_or(0.0),
        )),
    }
}

fn encode_object(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    match v {
        MemberValue::Null => value(SqlValue::Null),
        MemberValue::Int(n) => value(SqlValue::Int(*n)),
        MemberValue::Text(s) => value(
            s.trim()
                .parse::<i64>()
                .map_or_else(|_| SqlValue::Text(s.clone()), SqlValue::Int),
        ),
        other => Err(OrmError::Semantics(format!(
            "Cannot store {other:?} as an object id"
        ))),
    }
}

fn encode_polymorph(_: &MemberValue, context: &EncodeContext<'_>) -> Result<Assignment> {
    let class = context.class_name;
    let leaf = context
        .polymorphic
        .and_then(|base| class.strip_prefix(base))
        .map_or(class, |rest| rest.trim_start_matches('_'));
    value(SqlValue::Text(leaf.to_lowercase()))
}

fn encode_crc32(_: &MemberValue, context: &EncodeContext<'_>) -> Result<Assignment> {
    Ok(context.crc_source.map_or(Assignment::Omit, |source| {
        Assignment::Raw(format!("CRC32({})", context.dialect.quote_text(source)))
    }))
}

fn encode_hex(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    let bytes = match v {
        MemberValue::Null => return value(SqlValue::Null),
        MemberValue::Bytes(bytes) => bytes.clone(),
        MemberValue::Text(s) => decode_hex_text(s)?,
        other => {
            return Err(OrmError::Semantics(format!(
                "Cannot store {other:?} as hex"
            )))
        }
    };
    Ok(Assignment::Raw(format!("X'{}'", hex_string(&bytes))))
}

fn encode_binary(v: &MemberValue, context: &EncodeContext<'_>) -> Result<Assignment> {
    match v {
        MemberValue::Bytes(bytes) => Ok(Assignment::Raw(format!("X'{}'", hex_string(bytes)))),
        other => encode_text(other, context),
    }
}

fn encode_byte(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    value(SqlValue::Int(loose_int(v) % 255))
}

fn encode_boolean(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    value(SqlValue::Int(i64::from(v.truthy())))
}

fn encode_json(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    let json = match v {
        MemberValue::Json(json) => json.clone(),
        MemberValue::Null => serde_json::Value::Null,
        MemberValue::Bool(b) => serde_json::Value::from(*b),
        MemberValue::Int(n) => serde_json::Value::from(*n),
        MemberValue::Float(f) => serde_json::Value::from(*f),
        MemberValue::Bytes(bytes) => serde_json::Value::from(hex_string(bytes)),
        other => serde_json::Value::from(other.text().unwrap_or_default()),
    };
    value(SqlValue::Text(serde_json::to_string(&json)?))
}

fn encode_created(_: &MemberValue, context: &EncodeContext<'_>) -> Result<Assignment> {
    Ok(if context.insert {
        Assignment::Raw(String::from(SQL_NOW))
    } else {
        Assignment::Omit
    })
}

fn encode_modified(_: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    Ok(Assignment::Raw(String::from(SQL_NOW)))
}

/// Shared temporal encoding: empty is null, `now` is the database clock,
/// numbers are UTC epoch seconds.
fn encode_temporal(v: &MemberValue, format: &str) -> Result<Assignment> {
    if v.is_now() {
        return Ok(Assignment::Raw(String::from(SQL_NOW)));
    }
    if v.is_empty() {
        return value(SqlValue::Null);
    }
    let epoch = match v {
        MemberValue::Int(n) => Some(*n),
        MemberValue::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if let Some(seconds) = epoch {
        let stamp = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            OrmError::Semantics(format!("Timestamp {seconds} is out of range"))
        })?;
        return value(SqlValue::Text(stamp.naive_utc().format(format).to_string()));
    }
    let text = match v {
        MemberValue::Timestamp(t) => t.format(format).to_string(),
        MemberValue::Date(d) => d.format(format).to_string(),
        MemberValue::Time(t) => t.format(format).to_string(),
        other => other.text().unwrap_or_default(),
    };
    value(SqlValue::Text(text))
}

fn encode_timestamp(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    encode_temporal(v, DATETIME_FORMAT)
}

fn encode_date(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    encode_temporal(v, DATE_FORMAT)
}

fn encode_time(v: &MemberValue, _: &EncodeContext<'_>) -> Result<Assignment> {
    encode_temporal(v, TIME_FORMAT)
}

fn encode_ip(v: &MemberValue, context: &EncodeContext<'_>) -> Result<Assignment> {
    // Null is written as the text NULL, not SQL NULL.
    let Some(address) = v.text() else {
        return value(SqlValue::Text(String::from("NULL")));
    };
    Ok(Assignment::Raw(format!(
        "INET_ATON({})",
        context.dialect.quote_text(&address)
    )))
}

// ====================================================================
// Decoders
// ====================================================================

fn decode_integer(v: &SqlValue) -> Result<MemberValue> {
    Ok(v.to_int().map_or(MemberValue::Null, MemberValue::Int))
}

fn decode_text(v: &SqlValue) -> Result<MemberValue> {
    Ok(v.as_text().map_or(MemberValue::Null, MemberValue::Text))
}

fn decode_float(v: &SqlValue) -> Result<MemberValue> {
    Ok(v.to_float().map_or(MemberValue::Null, MemberValue::Float))
}

fn decode_object(v: &SqlValue) -> Result<MemberValue> {
    Ok(match v {
        SqlValue::Int(0) | SqlValue::Null => MemberValue::Null,
        SqlValue::Int(n) => MemberValue::Int(*n),
        SqlValue::Text(s) if s.is_empty() || s == "0" => MemberValue::Null,
        SqlValue::Text(s) => s
            .parse::<i64>()
            .map_or_else(|_| MemberValue::Text(s.clone()), MemberValue::Int),
        other => other.as_text().map_or(MemberValue::Null, MemberValue::Text),
    })
}

fn decode_hex(v: &SqlValue) -> Result<MemberValue> {
    Ok(v
        .as_text()
        .map_or(MemberValue::Null, |s| MemberValue::Text(hex_string(s.as_bytes()))))
}

fn decode_boolean(v: &SqlValue) -> Result<MemberValue> {
    Ok(match v {
        SqlValue::Null => MemberValue::Null,
        SqlValue::Bool(b) => MemberValue::Bool(*b),
        other => MemberValue::Bool(
            MemberValue::Text(other.as_text().unwrap_or_default()).truthy(),
        ),
    })
}

fn decode_json(v: &SqlValue) -> Result<MemberValue> {
    match v.as_text() {
        None => Ok(MemberValue::Null),
        Some(text) if text.is_empty() || text == "0" => Ok(MemberValue::Null),
        Some(text) => serde_json::from_str(&text).map(MemberValue::Json).map_err(|err| {
            warn!(error = %err, length = text.len(), "Unable to decode JSON member");
            OrmError::Json(err)
        }),
    }
}

fn decode_timestamp(v: &SqlValue) -> Result<MemberValue> {
    let Some(text) = non_empty_text(v, "0000-00-00 00:00:00") else {
        return Ok(MemberValue::Null);
    };
    NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
        .map(MemberValue::Timestamp)
        .map_err(|err| OrmError::Semantics(format!("Invalid timestamp '{text}': {err}")))
}

fn decode_date(v: &SqlValue) -> Result<MemberValue> {
    let Some(text) = non_empty_text(v, "0000-00-00") else {
        return Ok(MemberValue::Null);
    };
    NaiveDate::parse_from_str(&text, DATE_FORMAT)
        .map(MemberValue::Date)
        .map_err(|err| OrmError::Semantics(format!("Invalid date '{text}': {err}")))
}

fn decode_time(v: &SqlValue) -> Result<MemberValue> {
    let Some(text) = non_empty_text(v, "") else {
        return Ok(MemberValue::Null);
    };
    NaiveTime::parse_from_str(&text, TIME_FORMAT)
        .map(MemberValue::Time)
        .map_err(|err| OrmError::Semantics(format!("Invalid time '{text}': {err}")))
}

fn decode_ip(v: &SqlValue) -> Result<MemberValue> {
    let Some(text) = v.as_text() else {
        return Ok(MemberValue::Null);
    };
    if let Ok(n) = text.trim().parse::<u32>() {
        return Ok(MemberValue::Ip(Ipv4Addr::from(n)));
    }
    text.trim()
        .parse::<Ipv4Addr>()
        .map(MemberValue::Ip)
        .map_err(|err| OrmError::Semantics(format!("Invalid IP address '{text}': {err}")))
}

// ====================================================================
// Helpers
// ====================================================================

fn loose_int(v: &MemberValue) -> i64 {
    match v {
        MemberValue::Bool(b) => i64::from(*b),
        other => other
            .to_sql_value()
            .and_then(|v| v.to_int())
            .unwrap_or_default(),
    }
}

fn non_empty_text(v: &SqlValue, zero: &str) -> Option<String> {
    v.as_text()
        .filter(|text| !text.is_empty() && text != "0" && text != zero)
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02X}")).collect()
}

fn decode_hex_text(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(OrmError::Semantics(format!("Invalid hex string '{text}'")));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .map_err(|err| OrmError::Semantics(format!("Invalid hex string '{text}': {err}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zesk_schema::MySqlDialect;

    fn encode(t: MemberType, v: MemberValue) -> Assignment {
        encode_with(t, v, false)
    }

    fn encode_with(t: MemberType, v: MemberValue, insert: bool) -> Assignment {
        let dialect = MySqlDialect::new();
        let context = EncodeContext {
            dialect: &dialect,
            insert,
            class_name: "Content_Image",
            polymorphic: Some("Content"),
            crc_source: Some("hello"),
        };
        CoercionRegistry::new().encode(t, &v, &context).unwrap()
    }

    fn decode(t: MemberType, v: SqlValue) -> MemberValue {
        CoercionRegistry::new().decode(t, &v).unwrap()
    }

    #[test]
    fn test_every_type_has_a_coercion() {
        let registry = CoercionRegistry::new();
        for t in MemberType::ALL {
            assert!(registry.get(t).is_ok(), "{t} has no coercion");
        }
    }

    #[test]
    fn test_floats_treat_empty_as_null() {
        assert_eq!(
            encode(MemberType::Decimal, MemberValue::from("")),
            Assignment::Value(SqlValue::Null)
        );
        assert_eq!(
            encode(MemberType::Double, MemberValue::from("2.5")),
            Assignment::Value(SqlValue::Float(2.5))
        );
    }

    #[test]
    fn test_polymorph_stores_lowercased_leaf() {
        assert_eq!(
            encode(MemberType::Polymorph, MemberValue::Null),
            Assignment::Value(SqlValue::Text(String::from("image")))
        );
    }

    #[test]
    fn test_crc32_and_hex_are_raw() {
        assert_eq!(
            encode(MemberType::Crc32, MemberValue::Null),
            Assignment::Raw(String::from("CRC32('hello')"))
        );
        assert_eq!(
            encode(MemberType::Hex, MemberValue::from("deadBEEF")),
            Assignment::Raw(String::from("X'DEADBEEF'"))
        );
        let dialect = MySqlDialect::new();
        let context = EncodeContext {
            dialect: &dialect,
            insert: false,
            class_name: "Item",
            polymorphic: None,
            crc_source: None,
        };
        let registry = CoercionRegistry::new();
        assert!(registry
            .encode(MemberType::Hex, &MemberValue::from("xyz"), &context)
            .is_err());
    }

    #[test]
    fn test_byte_and_boolean() {
        assert_eq!(
            encode(MemberType::Byte, MemberValue::Int(300)),
            Assignment::Value(SqlValue::Int(45))
        );
        assert_eq!(
            encode(MemberType::Boolean, MemberValue::from("false")),
            Assignment::Value(SqlValue::Int(0))
        );
        assert_eq!(
            encode(MemberType::Boolean, MemberValue::from("yes")),
            Assignment::Value(SqlValue::Int(1))
        );
    }

    #[test]
    fn test_created_only_on_insert() {
        assert_eq!(encode(MemberType::Created, MemberValue::Null), Assignment::Omit);
        assert_eq!(
            encode_with(MemberType::Created, MemberValue::Null, true),
            Assignment::Raw(String::from("NOW()"))
        );
        assert_eq!(
            encode(MemberType::Modified, MemberValue::Null),
            Assignment::Raw(String::from("NOW()"))
        );
    }

    #[test]
    fn test_temporal_encoding() {
        assert_eq!(
            encode(MemberType::Timestamp, MemberValue::from("now")),
            Assignment::Raw(String::from("NOW()"))
        );
        assert_eq!(
            encode(MemberType::Datetime, MemberValue::from("")),
            Assignment::Value(SqlValue::Null)
        );
        assert_eq!(
            encode(MemberType::Timestamp, MemberValue::Int(86_400)),
            Assignment::Value(SqlValue::Text(String::from("1970-01-02 00:00:00")))
        );
        assert_eq!(
            encode(MemberType::Date, MemberValue::Int(86_400)),
            Assignment::Value(SqlValue::Text(String::from("1970-01-02")))
        );
        assert_eq!(
            encode(MemberType::Time, MemberValue::Int(3_661)),
            Assignment::Value(SqlValue::Text(String::from("01:01:01")))
        );
    }

    #[test]
    fn test_ip_encoding_keeps_literal_null() {
        assert_eq!(
            encode(MemberType::Ip, MemberValue::Null),
            Assignment::Value(SqlValue::Text(String::from("NULL")))
        );
        assert_eq!(
            encode(MemberType::Ip4, MemberValue::Ip(Ipv4Addr::new(10, 0, 0, 1))),
            Assignment::Raw(String::from("INET_ATON('10.0.0.1')"))
        );
    }

    #[test]
    fn test_json_encoding() {
        let doc = serde_json::json!({"a": [1, 2]});
        assert_eq!(
            encode(MemberType::Json, MemberValue::Json(doc.clone())),
            Assignment::Value(SqlValue::Text(String::from("{\"a\":[1,2]}")))
        );
        assert_eq!(
            decode(MemberType::Serialize, SqlValue::Text(String::from("{\"a\":[1,2]}"))),
            MemberValue::Json(doc)
        );
        assert_eq!(decode(MemberType::Json, SqlValue::Text(String::new())), MemberValue::Null);
    }

    #[test]
    fn test_decode_zero_dates_as_null() {
        assert_eq!(
            decode(MemberType::Timestamp, SqlValue::Text(String::from("0000-00-00 00:00:00"))),
            MemberValue::Null
        );
        assert_eq!(
            decode(MemberType::Date, SqlValue::Text(String::from("0000-00-00"))),
            MemberValue::Null
        );
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            decode(MemberType::Date, SqlValue::Text(String::from("2024-02-29"))),
            MemberValue::Date(date)
        );
    }

    #[test]
    fn test_decode_ip_and_object() {
        assert_eq!(
            decode(MemberType::Ip, SqlValue::Int(167_772_161)),
            MemberValue::Ip(Ipv4Addr::new(10, 0, 0, 1))
        );
        assert_eq!(decode(MemberType::Object, SqlValue::Int(0)), MemberValue::Null);
        assert_eq!(decode(MemberType::Object, SqlValue::Int(12)), MemberValue::Int(12));
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(
            decode(MemberType::Hex, SqlValue::Text(String::from("AB"))),
            MemberValue::Text(String::from("4142"))
        );
    }
}

//! Bind values and row data.
//!
//! `Value` is the single currency for literals handed to the parameter sink
//! and for column data coming back from the execution collaborator.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::Result;

/// A literal value bound as a named parameter or read from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean (BOOLEAN)
    Bool(bool),
    /// Small integer (SMALLINT)
    SmallInt(i16),
    /// Integer (INTEGER)
    Int(i32),
    /// Big integer (BIGINT)
    BigInt(i64),
    /// Single-precision float (REAL)
    Float(f32),
    /// Double-precision float (DOUBLE PRECISION)
    Double(f64),
    /// Variable-length string (VARCHAR, TEXT)
    String(String),
    /// Binary data (BYTEA, BLOB)
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// Date (DATE)
    Date(NaiveDate),
    /// Time (TIME)
    Time(NaiveTime),
    /// Timestamp without timezone (TIMESTAMP)
    Timestamp(NaiveDateTime),
    /// Timestamp with timezone (TIMESTAMPTZ)
    TimestampTz(DateTime<Utc>),
    /// JSON document
    Json(JsonValue),
    /// Array of values
    Array(Vec<Value>),
    /// Decimal/Numeric (NUMERIC, DECIMAL)
    Decimal(Decimal),
}

impl Value {
    /// Returns the generic SQL type name for this value.
    pub fn sql_type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::Float(_) => "REAL",
            Value::Double(_) => "DOUBLE PRECISION",
            Value::String(_) => "TEXT",
            Value::Bytes(_) => "BYTEA",
            Value::Uuid(_) => "UUID",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::TimestampTz(_) => "TIMESTAMPTZ",
            Value::Json(_) => "JSON",
            Value::Array(_) => "ARRAY",
            Value::Decimal(_) => "NUMERIC",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of the value, across all integer widths.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Hashable key used to correlate parent and related rows.
    ///
    /// Returns `None` for NULL, which never matches anything.
    pub fn group_key(&self) -> Option<GroupKey> {
        match self {
            Value::Null => None,
            Value::Bool(v) => Some(GroupKey::Bool(*v)),
            Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_) => {
                self.as_i64().map(GroupKey::Int)
            }
            Value::String(s) => Some(GroupKey::Text(s.clone())),
            Value::Uuid(u) => Some(GroupKey::Uuid(*u)),
            Value::Bytes(b) => Some(GroupKey::Bytes(b.clone())),
            other => Some(GroupKey::Text(json_key(other))),
        }
    }

    /// Converts the value to JSON.
    pub fn to_json(&self) -> Result<JsonValue> {
        Ok(match self {
            Value::Null => JsonValue::Null,
            Value::Bool(v) => JsonValue::Bool(*v),
            Value::SmallInt(v) => JsonValue::Number((*v).into()),
            Value::Int(v) => JsonValue::Number((*v).into()),
            Value::BigInt(v) => JsonValue::Number((*v).into()),
            Value::Float(v) => serde_json::Number::from_f64(f64::from(*v))
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Double(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(v) => JsonValue::String(v.clone()),
            Value::Bytes(v) => {
                let hex_string = v.iter().map(|b| format!("{:02x}", b)).collect::<String>();
                JsonValue::String(hex_string)
            }
            Value::Uuid(v) => JsonValue::String(v.to_string()),
            Value::Date(v) => JsonValue::String(v.to_string()),
            Value::Time(v) => JsonValue::String(v.to_string()),
            Value::Timestamp(v) => JsonValue::String(v.to_string()),
            Value::TimestampTz(v) => JsonValue::String(v.to_rfc3339()),
            Value::Json(v) => v.clone(),
            Value::Array(values) => {
                let json_values = values
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<Vec<_>>>()?;
                JsonValue::Array(json_values)
            }
            Value::Decimal(v) => JsonValue::String(v.to_string()),
        })
    }

    /// Converts a JSON scalar or array into a value; objects stay JSON.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::BigInt(i),
                None => n.as_f64().map(Value::Double).unwrap_or(Value::Null),
            },
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(_) => Value::Json(json.clone()),
        }
    }
}

fn json_key(value: &Value) -> String {
    match value.to_json() {
        Ok(json) => json.to_string(),
        Err(_) => format!("{:?}", value),
    }
}

/// Normalized, hashable form of a key value.
///
/// Integer widths collapse to `i64` so an `INTEGER` parent key matches a
/// `BIGINT` foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Bool(bool),
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Bytes(Vec<u8>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

/// One result row as returned by the execution collaborator.
///
/// Columns keep the order the database produced them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert(k, v);
        }
        row
    }

    /// Sets a column, replacing an existing value of the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.columns.iter().position(|(name, _)| name == column)?;
        Some(self.columns.remove(idx).1)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::Null.sql_type_name(), "NULL");
        assert_eq!(Value::BigInt(1).sql_type_name(), "BIGINT");
        assert_eq!(Value::String("a".into()).sql_type_name(), "TEXT");
        assert_eq!(Value::Json(serde_json::json!({})).sql_type_name(), "JSON");
    }

    #[test]
    fn test_group_key_normalizes_integer_widths() {
        assert_eq!(Value::Int(7).group_key(), Value::BigInt(7).group_key());
        assert_eq!(Value::SmallInt(7).group_key(), Some(GroupKey::Int(7)));
        assert_ne!(Value::Int(7).group_key(), Value::String("7".into()).group_key());
    }

    #[test]
    fn test_null_has_no_group_key() {
        assert!(Value::Null.group_key().is_none());
    }

    #[test]
    fn test_to_json() {
        let value = Value::Array(vec![Value::Int(1), Value::String("x".into()), Value::Null]);
        assert_eq!(value.to_json().unwrap(), serde_json::json!([1, "x", null]));
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_json().unwrap(), serde_json::json!("dead"));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json(&serde_json::json!(3)), Value::BigInt(3));
        assert_eq!(Value::from_json(&serde_json::json!("a")), Value::String("a".into()));
        assert!(matches!(Value::from_json(&serde_json::json!({"a": 1})), Value::Json(_)));
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<i32> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some(5i64)), Value::BigInt(5));
    }

    #[test]
    fn test_row_insert_replaces_and_keeps_order() {
        let mut row = Row::from_pairs([("id", Value::Int(1)), ("name", Value::from("a"))]);
        row.insert("id", 2i32);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(row.get("id"), Some(&Value::Int(2)));
        assert_eq!(row.remove("name"), Some(Value::String("a".into())));
        assert_eq!(row.len(), 1);
    }
}

// Bound parameter values and column types
//
// `Value` is what a caller binds into a criteria slot. It is checked
// against the slot's `FieldType` when bound, then handed to SQLite as-is.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, ToSql, ToSqlOutput};
use std::fmt;

/// Storage type of an entity column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Text,
    Bool,
    Timestamp,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Text => "text",
            FieldType::Bool => "bool",
            FieldType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter value bound to a predicate slot
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Column type this value can be compared against (None for Null)
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(FieldType::Integer),
            Value::Text(_) => Some(FieldType::Text),
            Value::Bool(_) => Some(FieldType::Bool),
            Value::Timestamp(_) => Some(FieldType::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Null => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Null)),
            Value::Int(v) => v.to_sql(),
            Value::Text(s) => s.to_sql(),
            Value::Bool(b) => b.to_sql(),
            Value::Timestamp(t) => t.to_sql(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Rust type an aggregate template can produce
pub trait Scalar: FromSql + Send + Sync + 'static {
    const FIELD_TYPE: FieldType;
}

impl Scalar for i64 {
    const FIELD_TYPE: FieldType = FieldType::Integer;
}

impl Scalar for String {
    const FIELD_TYPE: FieldType = FieldType::Text;
}

impl Scalar for bool {
    const FIELD_TYPE: FieldType = FieldType::Bool;
}

impl Scalar for DateTime<Utc> {
    const FIELD_TYPE: FieldType = FieldType::Timestamp;
}

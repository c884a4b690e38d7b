//! Runtime values stored in typed records.
//!
//! [`Value`] is the dynamically typed representation a [`TypedRecord`]
//! holds per field; [`FieldType`] is the static type a field declares.
//! Conversions to and from `serde_json::Value` are lossless except that
//! datetimes round-trip through RFC 3339 strings.
//!
//! [`TypedRecord`]: crate::TypedRecord

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value as Json};
use std::fmt;

/// Data types a record field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Bool,
    DateTime,
    List,
    Object,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
            FieldType::List => "list",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

/// A dynamically typed field value.
///
/// `Null` marks a field that is present but deliberately empty; it
/// matches any declared type and counts as missing for truthiness-based
/// passes like `clean` and required-field validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
    List(Vec<Value>),
    Object(Map<String, Json>),
}

impl Value {
    /// Runtime type of this value; `None` for `Null`.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Text(_) => Some(FieldType::Text),
            Value::Integer(_) => Some(FieldType::Integer),
            Value::Float(_) => Some(FieldType::Float),
            Value::Bool(_) => Some(FieldType::Bool),
            Value::DateTime(_) => Some(FieldType::DateTime),
            Value::List(_) => Some(FieldType::List),
            Value::Object(_) => Some(FieldType::Object),
        }
    }

    /// Truthiness as used by `clean` and required-field validation:
    /// empty and zero values count as absent.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Text(s) => !s.is_empty(),
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Bool(b) => *b,
            Value::DateTime(_) => true,
            Value::List(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }

    /// Converts a raw JSON value into its closest `Value` representation.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Object(map.clone()),
        }
    }

    /// Converts back into JSON for export.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Text(s) => Json::String(s.clone()),
            Value::Integer(n) => Json::Number(Number::from(*n)),
            Value::Float(n) => match Number::from_f64(*n) {
                Some(number) => Json::Number(number),
                None => Json::Null,
            },
            Value::Bool(b) => Json::Bool(*b),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(map.clone()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, Json>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
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

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

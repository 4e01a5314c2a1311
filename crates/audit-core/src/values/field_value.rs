//! Field value - the typed representation of one tracked column value
//!
//! Every value that flows through the audit pipeline (change detection,
//! buffering, storage, retrieval) is carried as a `FieldValue` and stored
//! in its canonical string form produced by the serializer.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A typed value of one tracked field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Uuid(Uuid),
    /// Lists and maps, stored as JSON
    Json(JsonValue),
}

impl FieldValue {
    /// The kind tag used for serializer handler lookup
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Bool(_) => ValueKind::Bool,
            Self::Date(_) => ValueKind::Date,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::Uuid(_) => ValueKind::Uuid,
            Self::Json(_) => ValueKind::Json,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<JsonValue> for FieldValue {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

/// The declared type of a tracked column
///
/// Used as the lookup key for serializer handlers and persisted implicitly
/// through the registered entity schema (never in the audit tables).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Int,
    Float,
    Bool,
    Date,
    DateTime,
    Uuid,
    Json,
    /// An extension type backed by a custom serializer handler
    Custom(String),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
            Self::Date => write!(f, "date"),
            Self::DateTime => write!(f, "datetime"),
            Self::Uuid => write!(f, "uuid"),
            Self::Json => write!(f, "json"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(FieldValue::from("hello").kind(), ValueKind::Text);
        assert_eq!(FieldValue::from(42i64).kind(), ValueKind::Int);
        assert_eq!(FieldValue::from(true).kind(), ValueKind::Bool);
        assert_eq!(
            FieldValue::Json(serde_json::json!({"a": 1})).kind(),
            ValueKind::Json
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ValueKind::DateTime.to_string(), "datetime");
        assert_eq!(ValueKind::Custom("money".into()).to_string(), "money");
    }

    #[test]
    fn test_equality() {
        assert_eq!(FieldValue::from(1i64), FieldValue::from(1i32));
        assert_ne!(FieldValue::from(1i64), FieldValue::from("1"));
    }
}

//! Serializer registry - converts typed field values to/from their stored form
//!
//! Old/new values live in the audit schema as strings. The canonical forms
//! are stable across releases because queries compare them verbatim:
//! booleans as `"1"`/`"0"`, dates and datetimes as ISO-8601, lists and maps
//! as JSON. Custom handlers can extend or override the builtin forms.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{AuditError, AuditResult};
use crate::values::{FieldValue, ValueKind};

/// A serialize/deserialize pair for one value kind
pub struct TypeHandler {
    serialize: Box<dyn Fn(&FieldValue) -> AuditResult<String> + Send + Sync>,
    deserialize: Box<dyn Fn(&str) -> AuditResult<FieldValue> + Send + Sync>,
}

impl TypeHandler {
    /// Create a handler from a serialize/deserialize closure pair
    pub fn new<S, D>(serialize: S, deserialize: D) -> Self
    where
        S: Fn(&FieldValue) -> AuditResult<String> + Send + Sync + 'static,
        D: Fn(&str) -> AuditResult<FieldValue> + Send + Sync + 'static,
    {
        Self {
            serialize: Box::new(serialize),
            deserialize: Box::new(deserialize),
        }
    }
}

impl std::fmt::Debug for TypeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeHandler").finish_non_exhaustive()
    }
}

/// Registry of value handlers, builtin and custom
///
/// Custom handlers take precedence over builtins for the same kind.
/// Read-mostly: handler registration happens at startup, lookups happen on
/// every detected change and every typed retrieval access.
#[derive(Debug, Default)]
pub struct Serializer {
    custom: RwLock<HashMap<ValueKind, TypeHandler>>,
}

impl Serializer {
    /// Create a serializer with the builtin handlers only
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a handler exists for the given kind
    ///
    /// Used by the tracking registry to reject untrackable field types at
    /// registration time rather than failing later at write time.
    pub fn has_handler(&self, kind: &ValueKind) -> bool {
        !matches!(kind, ValueKind::Custom(_)) || self.custom.read().contains_key(kind)
    }

    /// Serialize a value declared as `kind` into its canonical string form
    pub fn serialize(&self, value: &FieldValue, kind: &ValueKind) -> AuditResult<String> {
        if let Some(handler) = self.custom.read().get(kind) {
            return (handler.serialize)(value);
        }
        builtin_serialize(value, kind)
    }

    /// Serialize an optional value; `None` stays `None`
    pub fn serialize_opt(
        &self,
        value: Option<&FieldValue>,
        kind: &ValueKind,
    ) -> AuditResult<Option<String>> {
        value.map(|v| self.serialize(v, kind)).transpose()
    }

    /// Deserialize a stored string back into a typed value
    pub fn deserialize(&self, raw: &str, kind: &ValueKind) -> AuditResult<FieldValue> {
        if let Some(handler) = self.custom.read().get(kind) {
            return (handler.deserialize)(raw);
        }
        builtin_deserialize(raw, kind)
    }

    /// Register a custom handler, overriding any builtin for the same kind
    pub fn register_custom_handler(&self, kind: ValueKind, handler: TypeHandler) {
        self.custom.write().insert(kind, handler);
    }
}

fn mismatch(value: &FieldValue, kind: &ValueKind) -> AuditError {
    AuditError::Serialization {
        kind: kind.to_string(),
        message: format!("value has kind '{}'", value.kind()),
    }
}

fn builtin_serialize(value: &FieldValue, kind: &ValueKind) -> AuditResult<String> {
    match (kind, value) {
        (ValueKind::Text, FieldValue::Text(v)) => Ok(v.clone()),
        (ValueKind::Int, FieldValue::Int(v)) => Ok(v.to_string()),
        (ValueKind::Float, FieldValue::Float(v)) => Ok(v.to_string()),
        // Booleans are stored as '1' or '0'
        (ValueKind::Bool, FieldValue::Bool(v)) => Ok(if *v { "1" } else { "0" }.to_string()),
        (ValueKind::Date, FieldValue::Date(v)) => Ok(v.format("%Y-%m-%d").to_string()),
        (ValueKind::DateTime, FieldValue::DateTime(v)) => Ok(v.to_rfc3339()),
        (ValueKind::Uuid, FieldValue::Uuid(v)) => Ok(v.to_string()),
        (ValueKind::Json, FieldValue::Json(v)) => {
            serde_json::to_string(v).map_err(|e| AuditError::Serialization {
                kind: kind.to_string(),
                message: e.to_string(),
            })
        }
        (ValueKind::Custom(name), _) => Err(AuditError::Serialization {
            kind: name.clone(),
            message: "no custom handler registered".to_string(),
        }),
        (kind, value) => Err(mismatch(value, kind)),
    }
}

fn builtin_deserialize(raw: &str, kind: &ValueKind) -> AuditResult<FieldValue> {
    let parse_err = |message: String| AuditError::Deserialization {
        kind: kind.to_string(),
        value: raw.to_string(),
        message,
    };

    match kind {
        ValueKind::Text => Ok(FieldValue::Text(raw.to_string())),
        ValueKind::Int => raw
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|e| parse_err(e.to_string())),
        ValueKind::Float => raw
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|e| parse_err(e.to_string())),
        ValueKind::Bool => Ok(FieldValue::Bool(raw == "1")),
        ValueKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(FieldValue::Date)
            .map_err(|e| parse_err(e.to_string())),
        ValueKind::DateTime => DateTime::parse_from_rfc3339(raw)
            .map(|dt| FieldValue::DateTime(dt.with_timezone(&Utc)))
            .map_err(|e| parse_err(e.to_string())),
        ValueKind::Uuid => Uuid::parse_str(raw)
            .map(FieldValue::Uuid)
            .map_err(|e| parse_err(e.to_string())),
        ValueKind::Json => serde_json::from_str(raw)
            .map(FieldValue::Json)
            .map_err(|e| parse_err(e.to_string())),
        ValueKind::Custom(name) => Err(AuditError::Deserialization {
            kind: name.clone(),
            value: raw.to_string(),
            message: "no custom handler registered".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn roundtrip(value: FieldValue) {
        let serializer = Serializer::new();
        let kind = value.kind();
        let raw = serializer.serialize(&value, &kind).unwrap();
        let back = serializer.deserialize(&raw, &kind).unwrap();
        assert_eq!(back, value, "round trip failed for {kind}");
    }

    #[test]
    fn test_roundtrip_all_builtin_kinds() {
        roundtrip(FieldValue::Text("hello world".into()));
        roundtrip(FieldValue::Int(-42));
        roundtrip(FieldValue::Float(3.25));
        roundtrip(FieldValue::Bool(true));
        roundtrip(FieldValue::Bool(false));
        roundtrip(FieldValue::Date(
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        ));
        roundtrip(FieldValue::DateTime(
            Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 45).unwrap(),
        ));
        roundtrip(FieldValue::Uuid(Uuid::new_v4()));
        roundtrip(FieldValue::Json(serde_json::json!({"a": [1, 2], "b": "x"})));
    }

    #[test]
    fn test_bool_stored_as_one_and_zero() {
        let serializer = Serializer::new();
        assert_eq!(
            serializer
                .serialize(&FieldValue::Bool(true), &ValueKind::Bool)
                .unwrap(),
            "1"
        );
        assert_eq!(
            serializer
                .serialize(&FieldValue::Bool(false), &ValueKind::Bool)
                .unwrap(),
            "0"
        );
    }

    #[test]
    fn test_serialize_opt_none_stays_none() {
        let serializer = Serializer::new();
        assert_eq!(serializer.serialize_opt(None, &ValueKind::Text).unwrap(), None);
    }

    #[test]
    fn test_kind_mismatch_is_an_error() {
        let serializer = Serializer::new();
        let err = serializer
            .serialize(&FieldValue::Int(1), &ValueKind::Bool)
            .unwrap_err();
        assert_eq!(err.code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_custom_kind_without_handler() {
        let serializer = Serializer::new();
        let kind = ValueKind::Custom("money".into());
        assert!(!serializer.has_handler(&kind));
        assert!(serializer.serialize(&FieldValue::Int(100), &kind).is_err());
    }

    #[test]
    fn test_custom_handler_registration() {
        let serializer = Serializer::new();
        let kind = ValueKind::Custom("money".into());

        // Cents carried as Int, stored with a currency prefix
        serializer.register_custom_handler(
            kind.clone(),
            TypeHandler::new(
                |v| match v {
                    FieldValue::Int(cents) => Ok(format!("USD:{cents}")),
                    other => Err(AuditError::Serialization {
                        kind: "money".into(),
                        message: format!("expected cents, got '{}'", other.kind()),
                    }),
                },
                |raw| {
                    let cents = raw.trim_start_matches("USD:").parse::<i64>().map_err(|e| {
                        AuditError::Deserialization {
                            kind: "money".into(),
                            value: raw.to_string(),
                            message: e.to_string(),
                        }
                    })?;
                    Ok(FieldValue::Int(cents))
                },
            ),
        );

        assert!(serializer.has_handler(&kind));
        let raw = serializer.serialize(&FieldValue::Int(995), &kind).unwrap();
        assert_eq!(raw, "USD:995");
        assert_eq!(
            serializer.deserialize(&raw, &kind).unwrap(),
            FieldValue::Int(995)
        );
    }

    #[test]
    fn test_custom_handler_overrides_builtin() {
        let serializer = Serializer::new();
        serializer.register_custom_handler(
            ValueKind::Bool,
            TypeHandler::new(
                |v| match v {
                    FieldValue::Bool(b) => Ok(b.to_string()),
                    other => Err(AuditError::Serialization {
                        kind: "bool".into(),
                        message: format!("value has kind '{}'", other.kind()),
                    }),
                },
                |raw| Ok(FieldValue::Bool(raw == "true")),
            ),
        );

        assert_eq!(
            serializer
                .serialize(&FieldValue::Bool(true), &ValueKind::Bool)
                .unwrap(),
            "true"
        );
    }
}

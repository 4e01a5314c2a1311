//! Field change and audit record types
//!
//! `FieldChange` is the normalized detector output (canonical string
//! values, ready for storage). `AuditRecord`/`AuditChange` are the
//! reconstructed, query-facing views produced by the retrieval engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuditResult;
use crate::serializer::Serializer;
use crate::values::{FieldValue, ValueKind};

/// One detected field delta, in canonical serialized form
///
/// `old_value` is `None` for fields captured on a newly inserted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// One field delta of a stored audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditChange {
    pub field_name: String,
    /// Declared kind of the field, resolved from the tracking registry
    pub kind: ValueKind,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl AuditChange {
    /// Old value deserialized back to its native type
    pub fn old_typed(&self, serializer: &Serializer) -> AuditResult<Option<FieldValue>> {
        self.old_value
            .as_deref()
            .map(|raw| serializer.deserialize(raw, &self.kind))
            .transpose()
    }

    /// New value deserialized back to its native type
    pub fn new_typed(&self, serializer: &Serializer) -> AuditResult<Option<FieldValue>> {
        self.new_value
            .as_deref()
            .map(|raw| serializer.deserialize(raw, &self.kind))
            .transpose()
    }
}

/// One historical change event for one resource instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Time-sortable record id (UUIDv7)
    pub record_id: Uuid,
    pub resource_id: String,
    /// Audit table label if set, else the table name
    pub resource_type: String,
    pub timestamp: DateTime<Utc>,
    pub changed_by: Option<String>,
    pub impersonated_by: Option<String>,
    pub reason: Option<String>,
    pub changes: Vec<AuditChange>,
}

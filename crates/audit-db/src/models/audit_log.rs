//! Audit log database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for audit_logs rows
///
/// One row per observed instance per flush cycle. The field-level deltas
/// live in audit_field_changes, keyed by `record_id`.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogModel {
    /// Time-sortable UUIDv7 record id
    pub record_id: Uuid,
    pub table_id: i64,
    pub resource_id: String,
    pub timestamp: DateTime<Utc>,
    pub changed_by: Option<String>,
    pub impersonated_by: Option<String>,
    pub reason: Option<String>,
}

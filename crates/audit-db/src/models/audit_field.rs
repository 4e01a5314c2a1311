//! Audit field catalog model

use sqlx::FromRow;

/// Database model for the audit_fields catalog
///
/// One row per (table, field) pair that ever recorded a change.
#[derive(Debug, Clone, FromRow)]
pub struct AuditFieldModel {
    pub field_id: i64,
    pub table_id: i64,
    pub field_name: String,
}

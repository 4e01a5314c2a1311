//! Field change database model

use sqlx::FromRow;
use uuid::Uuid;

/// Database model for audit_field_changes rows
///
/// Values are stored in their canonical serialized text form; `None` means
/// the side was null (old side of an insert capture).
#[derive(Debug, Clone, FromRow)]
pub struct AuditFieldChangeModel {
    pub change_id: i64,
    pub record_id: Uuid,
    pub field_id: i64,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

//! Audit table catalog model

use sqlx::FromRow;

/// Database model for the audit_tables catalog
///
/// One row per tracked physical table, created lazily on the first write
/// that touches the table.
#[derive(Debug, Clone, FromRow)]
pub struct AuditTableModel {
    pub table_id: i64,
    /// Physical table name of the tracked entity
    pub table_name: String,
    /// Field on the entity that holds the stable resource id
    pub resource_id_field: String,
    /// Display label; falls back to the table name when absent
    pub label: Option<String>,
}

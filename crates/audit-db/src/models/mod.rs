//! Database models with SQLx `FromRow` derives

mod audit_field;
mod audit_log;
mod audit_table;
mod field_change;

pub use audit_field::AuditFieldModel;
pub use audit_log::AuditLogModel;
pub use audit_table::AuditTableModel;
pub use field_change::AuditFieldChangeModel;

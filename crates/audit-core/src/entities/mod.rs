//! Audit record types - detector output and query-facing reconstructions

mod record;

pub use record::{AuditChange, AuditRecord, FieldChange};

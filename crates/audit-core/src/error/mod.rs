//! Error taxonomy for the audit layer

mod audit_error;

pub use audit_error::{AuditError, AuditResult};

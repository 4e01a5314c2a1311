//! Audit context - who made a change, and why

mod audit_context;

pub use audit_context::{AuditContext, LogContext};

//! Per-transaction audit session

mod audit_session;

pub use audit_session::AuditSession;

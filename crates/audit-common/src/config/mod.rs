//! Audit configuration

mod audit_config;

pub use audit_config::{AuditConfig, UserIdCallback, UserTracking};

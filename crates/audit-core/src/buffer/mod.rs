//! Audit buffer - per-transaction holding area for detected changes

mod audit_buffer;

pub use audit_buffer::{AuditBuffer, BufferEntry};

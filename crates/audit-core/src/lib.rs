//! # audit-core
//!
//! Domain layer of the audit trail: typed field values and their canonical
//! serialized forms, the process-wide tracking registry, the change
//! detector that diffs in-flight entity state against persisted state, the
//! per-transaction change buffer, and the query-facing record types.
//! This crate has zero dependencies on the database layer.

pub mod buffer;
pub mod context;
pub mod detector;
pub mod entities;
pub mod error;
pub mod registry;
pub mod schema;
pub mod serializer;
pub mod values;

// Re-export commonly used types at crate root
pub use buffer::{AuditBuffer, BufferEntry};
pub use context::{AuditContext, LogContext};
pub use detector::{detect_changes, AuditableInstance, FailurePolicy, FieldHistory, FlushSet};
pub use entities::{AuditChange, AuditRecord, FieldChange};
pub use error::{AuditError, AuditResult};
pub use registry::{TrackOptions, TrackedTableConfig, TrackingRegistry};
pub use schema::{EntitySchema, FieldDef};
pub use serializer::{Serializer, TypeHandler};
pub use values::{FieldValue, ValueKind};

//! # audit-common
//!
//! Shared utilities for the audit trail: runtime configuration (user
//! attribution, timezone policy, failure policy) and telemetry setup.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{AuditConfig, UserIdCallback, UserTracking};
pub use telemetry::{init_tracing, init_tracing_with_config, try_init_tracing, TracingConfig};

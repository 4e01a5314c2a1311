//! # audit-db
//!
//! Database layer of the audit trail, backed by PostgreSQL via SQLx.
//!
//! ## Overview
//!
//! This crate persists and queries what `audit-core` detects:
//!
//! - Connection pool management
//! - Audit schema bootstrap (catalog, log, and delta tables)
//! - Database models with SQLx `FromRow` derives
//! - The audit writer, running on the host's open transaction
//! - The retrieval engine reconstructing `AuditRecord`s
//! - The per-transaction `AuditSession` tying capture and flush together
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use audit_common::AuditConfig;
//! use audit_core::{EntitySchema, Serializer, TrackOptions, TrackingRegistry, ValueKind};
//! use audit_db::{create_pool_from_env, ensure_schema, AuditSession};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool_from_env().await?;
//!     ensure_schema(&pool).await?;
//!
//!     let serializer = Arc::new(Serializer::new());
//!     let registry = Arc::new(TrackingRegistry::new());
//!     registry.register(
//!         EntitySchema::new("customer", "customers", "id")
//!             .field("id", ValueKind::Int)
//!             .field("name", ValueKind::Text),
//!         TrackOptions::default(),
//!         &serializer,
//!     )?;
//!
//!     let mut session = AuditSession::new(registry, serializer, AuditConfig::new());
//!     // observe the working set, then flush on the host transaction...
//!     Ok(())
//! }
//! ```

mod error;
pub mod models;
pub mod pool;
pub mod retrieval;
pub mod schema;
pub mod session;
pub mod writer;

// Re-export commonly used types
pub use pool::{create_pool, create_pool_from_env, DatabaseConfig, PgPool};
pub use retrieval::{
    ChangeQuery, ResourceIdFilter, RetrievalEngine, SortDirection, SortField, TimeBound,
};
pub use schema::{ensure_schema, table_exists};
pub use session::AuditSession;
pub use writer::register_change;

//! Error handling utilities for the database layer

use audit_core::AuditError;
use sqlx::Error as SqlxError;

/// Convert a SQLx error to an `AuditError`
pub(crate) fn map_db_error(e: SqlxError) -> AuditError {
    AuditError::DatabaseError(e.to_string())
}

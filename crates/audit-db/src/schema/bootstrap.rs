//! Creates the persisted audit schema
//!
//! Four tables: a catalog of tracked tables and their fields, the audit
//! log (one row per observed instance per flush), and the field-level
//! deltas hanging off each log row. All statements are idempotent so the
//! bootstrap can run on every startup.

use sqlx::PgPool;
use tracing::{debug, instrument};

use audit_core::AuditResult;

use crate::error::map_db_error;

const SCHEMA_STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS audit_tables (
        table_id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        table_name TEXT NOT NULL UNIQUE,
        resource_id_field TEXT NOT NULL,
        label TEXT
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS audit_fields (
        field_id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        table_id BIGINT NOT NULL REFERENCES audit_tables (table_id),
        field_name TEXT NOT NULL,
        UNIQUE (table_id, field_name)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS audit_logs (
        record_id UUID PRIMARY KEY,
        table_id BIGINT NOT NULL REFERENCES audit_tables (table_id),
        resource_id TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL,
        changed_by VARCHAR(256),
        impersonated_by VARCHAR(256),
        reason VARCHAR(512)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS audit_field_changes (
        change_id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        record_id UUID NOT NULL REFERENCES audit_logs (record_id) ON DELETE CASCADE,
        field_id BIGINT NOT NULL REFERENCES audit_fields (field_id),
        old_value TEXT,
        new_value TEXT
    )
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_audit_logs_table_resource
        ON audit_logs (table_id, resource_id)
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_audit_logs_timestamp
        ON audit_logs (timestamp)
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_audit_field_changes_record
        ON audit_field_changes (record_id)
    ",
];

/// Create the audit tables and indexes if they do not exist
#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &PgPool) -> AuditResult<()> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(map_db_error)?;
    }
    debug!("audit schema is in place");
    Ok(())
}

/// Check whether a table exists in the current schema
pub async fn table_exists(pool: &PgPool, table_name: &str) -> AuditResult<bool> {
    let exists: bool = sqlx::query_scalar(
        r"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_name = $1
        )
        ",
    )
    .bind(table_name)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)?;

    Ok(exists)
}

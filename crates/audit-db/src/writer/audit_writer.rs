//! Writes buffered changes into the audit schema
//!
//! Runs on the caller's open transaction so audit rows commit and roll
//! back together with the business writes. Catalog rows (audit_tables,
//! audit_fields) are created lazily on first use. A concurrent transaction
//! may commit the same catalog row between our lookup and our insert, so
//! the inserts are upserts: `ON CONFLICT .. DO UPDATE .. RETURNING` yields
//! the row on both paths without ever aborting the transaction.

use std::collections::HashMap;

use sqlx::{PgConnection, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use audit_core::{AuditError, AuditResult, BufferEntry, TrackedTableConfig};

use crate::error::map_db_error;
use crate::models::AuditTableModel;

/// Persist one drained buffer group on the caller's transaction
///
/// All entries must belong to the entity type described by `config`.
/// Entries with an empty change list produce no log row (the catalog row
/// for the table is still created). An entry with no captured resource id
/// fails with `MissingResourceId`.
#[instrument(
    skip(txn, config, entries),
    fields(entity = %config.schema.entity_name, entries = entries.len())
)]
pub async fn register_change(
    txn: &mut Transaction<'_, Postgres>,
    config: &TrackedTableConfig,
    entries: &[BufferEntry],
) -> AuditResult<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let table = resolve_table(txn, config).await?;
    // Field ids resolved once per call, not once per entry
    let mut field_ids: HashMap<String, i64> = HashMap::new();

    for entry in entries {
        if entry.changes.is_empty() {
            continue;
        }

        let resource_id = entry.resource_id.as_deref().ok_or_else(|| {
            AuditError::MissingResourceId {
                entity: config.schema.entity_name.clone(),
                field: config.resource_id_field.clone(),
            }
        })?;

        let record_id = Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO audit_logs (record_id, table_id, resource_id, timestamp,
                                    changed_by, impersonated_by, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record_id)
        .bind(table.table_id)
        .bind(resource_id)
        .bind(entry.context.timestamp)
        .bind(entry.context.changed_by.as_deref())
        .bind(entry.context.impersonated_by.as_deref())
        .bind(entry.context.reason.as_deref())
        .execute(&mut **txn)
        .await
        .map_err(map_db_error)?;

        for change in &entry.changes {
            let field_id =
                resolve_field(txn, table.table_id, &change.field, &mut field_ids).await?;

            sqlx::query(
                r#"
                INSERT INTO audit_field_changes (record_id, field_id, old_value, new_value)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(record_id)
            .bind(field_id)
            .bind(change.old_value.as_deref())
            .bind(change.new_value.as_deref())
            .execute(&mut **txn)
            .await
            .map_err(map_db_error)?;
        }
    }

    Ok(())
}

/// Fetch the catalog row for a table, creating it if absent
///
/// The create path is an upsert: losing a creation race to a concurrent
/// transaction must not abort this one, and the no-op `DO UPDATE` makes
/// `RETURNING` yield the surviving row either way.
async fn resolve_table(
    txn: &mut Transaction<'_, Postgres>,
    config: &TrackedTableConfig,
) -> AuditResult<AuditTableModel> {
    if let Some(existing) = fetch_table(&mut **txn, &config.schema.table_name).await? {
        return Ok(existing);
    }

    sqlx::query_as::<_, AuditTableModel>(
        r#"
        INSERT INTO audit_tables (table_name, resource_id_field, label)
        VALUES ($1, $2, $3)
        ON CONFLICT (table_name) DO UPDATE SET table_name = EXCLUDED.table_name
        RETURNING table_id, table_name, resource_id_field, label
        "#,
    )
    .bind(&config.schema.table_name)
    .bind(&config.resource_id_field)
    .bind(config.label.as_deref())
    .fetch_one(&mut **txn)
    .await
    .map_err(map_db_error)
}

async fn fetch_table(
    conn: &mut PgConnection,
    table_name: &str,
) -> AuditResult<Option<AuditTableModel>> {
    sqlx::query_as::<_, AuditTableModel>(
        r#"
        SELECT table_id, table_name, resource_id_field, label
        FROM audit_tables
        WHERE table_name = $1
        "#,
    )
    .bind(table_name)
    .fetch_optional(conn)
    .await
    .map_err(map_db_error)
}

/// Fetch the catalog id of a field, creating the row if absent
///
/// Same upsert contract as `resolve_table`.
async fn resolve_field(
    txn: &mut Transaction<'_, Postgres>,
    table_id: i64,
    field_name: &str,
    cache: &mut HashMap<String, i64>,
) -> AuditResult<i64> {
    if let Some(field_id) = cache.get(field_name) {
        return Ok(*field_id);
    }

    if let Some(field_id) = fetch_field(&mut **txn, table_id, field_name).await? {
        cache.insert(field_name.to_string(), field_id);
        return Ok(field_id);
    }

    let field_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO audit_fields (table_id, field_name)
        VALUES ($1, $2)
        ON CONFLICT (table_id, field_name) DO UPDATE SET field_name = EXCLUDED.field_name
        RETURNING field_id
        "#,
    )
    .bind(table_id)
    .bind(field_name)
    .fetch_one(&mut **txn)
    .await
    .map_err(map_db_error)?;

    cache.insert(field_name.to_string(), field_id);
    Ok(field_id)
}

async fn fetch_field(
    conn: &mut PgConnection,
    table_id: i64,
    field_name: &str,
) -> AuditResult<Option<i64>> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT field_id
        FROM audit_fields
        WHERE table_id = $1 AND field_name = $2
        "#,
    )
    .bind(table_id)
    .bind(field_name)
    .fetch_optional(conn)
    .await
    .map_err(map_db_error)
}

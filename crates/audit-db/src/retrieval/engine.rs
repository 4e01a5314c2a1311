//! Reconstructs `AuditRecord`s from the stored audit schema
//!
//! All filters are applied server-side. The record query joins through
//! audit_field_changes so a field filter narrows the record set, then the
//! matching deltas are fetched in a second query and grouped per record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{instrument, warn};
use uuid::Uuid;

use audit_common::AuditConfig;
use audit_core::{
    AuditChange, AuditError, AuditRecord, AuditResult, TrackedTableConfig, TrackingRegistry,
    ValueKind,
};

use crate::error::map_db_error;
use crate::models::{AuditFieldChangeModel, AuditFieldModel, AuditLogModel, AuditTableModel};
use crate::retrieval::query::{ChangeQuery, TimeBound};

/// Read-side of the audit layer
///
/// Holds its own pool handle: by default retrieval runs outside any host
/// transaction and only sees committed audit rows. Callers that need to
/// read inside their own transaction use `get_resource_changes_on`.
#[derive(Clone)]
pub struct RetrievalEngine {
    pool: PgPool,
    registry: Arc<TrackingRegistry>,
    config: AuditConfig,
}

impl RetrievalEngine {
    pub fn new(pool: PgPool, registry: Arc<TrackingRegistry>, config: AuditConfig) -> Self {
        Self {
            pool,
            registry,
            config,
        }
    }

    /// Fetch the change history of an entity type on a pooled connection
    ///
    /// Fails with `NotRegistered` for unknown entity types, with
    /// `TableNotInAuditSchema` when the type is registered but nothing was
    /// ever recorded for it, and with `UserFilterNotConfigured` when a user
    /// filter is given without user tracking enabled. Date-range bounds are
    /// inclusive on both ends.
    #[instrument(skip(self, query), fields(entity = entity_name))]
    pub async fn get_resource_changes(
        &self,
        entity_name: &str,
        query: &ChangeQuery,
    ) -> AuditResult<Vec<AuditRecord>> {
        // Held for the duration of the call, released on return
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        self.get_resource_changes_on(&mut conn, entity_name, query)
            .await
    }

    /// Fetch the change history on a caller-supplied connection
    ///
    /// Use this to read audit rows from inside the caller's open
    /// transaction, uncommitted writes included.
    pub async fn get_resource_changes_on(
        &self,
        conn: &mut PgConnection,
        entity_name: &str,
        query: &ChangeQuery,
    ) -> AuditResult<Vec<AuditRecord>> {
        let tracked = self.registry.get(entity_name)?;

        if !query.user_ids.is_empty() && !self.config.logs_users() {
            return Err(AuditError::UserFilterNotConfigured);
        }

        let (start, end) = normalize_range(query.start, query.end, self.config.timezone)?;
        let resource_ids = query.canonical_resource_ids();

        let table = fetch_table(&mut *conn, &tracked.schema.table_name).await?;
        let fields = fetch_fields(&mut *conn, table.table_id, &query.field_names).await?;
        if fields.is_empty() {
            // A field filter that matches nothing recorded yet
            return Ok(Vec::new());
        }
        let field_ids: Vec<i64> = fields.iter().map(|f| f.field_id).collect();
        let field_names: HashMap<i64, &str> = fields
            .iter()
            .map(|f| (f.field_id, f.field_name.as_str()))
            .collect();

        let logs = fetch_logs(&mut *conn, &field_ids, &resource_ids, start, end, query).await?;
        if logs.is_empty() {
            return Ok(Vec::new());
        }

        let record_ids: Vec<Uuid> = logs.iter().map(|l| l.record_id).collect();
        let deltas = fetch_deltas(&mut *conn, &record_ids, &field_ids).await?;

        let mut changes_by_record: HashMap<Uuid, Vec<AuditChange>> = HashMap::new();
        for delta in deltas {
            let Some(field_name) = field_names.get(&delta.field_id) else {
                continue;
            };
            changes_by_record
                .entry(delta.record_id)
                .or_default()
                .push(AuditChange {
                    field_name: (*field_name).to_string(),
                    kind: field_kind(&tracked, field_name),
                    old_value: delta.old_value,
                    new_value: delta.new_value,
                });
        }

        let resource_type = tracked.resource_type().to_string();
        Ok(logs
            .into_iter()
            .map(|log| AuditRecord {
                record_id: log.record_id,
                resource_id: log.resource_id,
                resource_type: resource_type.clone(),
                timestamp: log.timestamp,
                changed_by: log.changed_by,
                impersonated_by: log.impersonated_by,
                reason: log.reason,
                changes: changes_by_record.remove(&log.record_id).unwrap_or_default(),
            })
            .collect())
    }
}

async fn fetch_table(conn: &mut PgConnection, table_name: &str) -> AuditResult<AuditTableModel> {
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
    .map_err(map_db_error)?
    .ok_or_else(|| AuditError::TableNotInAuditSchema(table_name.to_string()))
}

async fn fetch_fields(
    conn: &mut PgConnection,
    table_id: i64,
    field_filter: &[String],
) -> AuditResult<Vec<AuditFieldModel>> {
    let fields = if field_filter.is_empty() {
        sqlx::query_as::<_, AuditFieldModel>(
            r#"
            SELECT field_id, table_id, field_name
            FROM audit_fields
            WHERE table_id = $1
            "#,
        )
        .bind(table_id)
        .fetch_all(conn)
        .await
    } else {
        sqlx::query_as::<_, AuditFieldModel>(
            r#"
            SELECT field_id, table_id, field_name
            FROM audit_fields
            WHERE table_id = $1 AND field_name = ANY($2)
            "#,
        )
        .bind(table_id)
        .bind(field_filter)
        .fetch_all(conn)
        .await
    };

    fields.map_err(map_db_error)
}

async fn fetch_logs(
    conn: &mut PgConnection,
    field_ids: &[i64],
    resource_ids: &[String],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    query: &ChangeQuery,
) -> AuditResult<Vec<AuditLogModel>> {
    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "SELECT DISTINCT l.record_id, l.table_id, l.resource_id, l.timestamp, \
         l.changed_by, l.impersonated_by, l.reason \
         FROM audit_logs l \
         JOIN audit_field_changes c ON c.record_id = l.record_id \
         WHERE c.field_id = ANY(",
    );
    builder.push_bind(field_ids.to_vec());
    builder.push(")");

    if !resource_ids.is_empty() {
        builder.push(" AND l.resource_id = ANY(");
        builder.push_bind(resource_ids.to_vec());
        builder.push(")");
    }
    if let Some(start) = start {
        builder.push(" AND l.timestamp >= ");
        builder.push_bind(start);
    }
    if let Some(end) = end {
        builder.push(" AND l.timestamp <= ");
        builder.push_bind(end);
    }
    if !query.user_ids.is_empty() {
        builder.push(" AND l.changed_by = ANY(");
        builder.push_bind(query.user_ids.clone());
        builder.push(")");
    }

    // Sort column and direction come from a whitelist, never caller text
    builder.push(" ORDER BY ");
    builder.push(query.sort_by.column());
    builder.push(" ");
    builder.push(query.sort_direction.sql());

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    if let Some(offset) = query.offset {
        builder.push(" OFFSET ");
        builder.push_bind(offset);
    }

    builder
        .build_query_as::<AuditLogModel>()
        .fetch_all(conn)
        .await
        .map_err(map_db_error)
}

async fn fetch_deltas(
    conn: &mut PgConnection,
    record_ids: &[Uuid],
    field_ids: &[i64],
) -> AuditResult<Vec<AuditFieldChangeModel>> {
    sqlx::query_as::<_, AuditFieldChangeModel>(
        r#"
        SELECT change_id, record_id, field_id, old_value, new_value
        FROM audit_field_changes
        WHERE record_id = ANY($1) AND field_id = ANY($2)
        ORDER BY change_id
        "#,
    )
    .bind(record_ids)
    .bind(field_ids)
    .fetch_all(conn)
    .await
    .map_err(map_db_error)
}

/// Declared kind of a stored field; text when the field was dropped from
/// the registered schema after rows were written
fn field_kind(tracked: &TrackedTableConfig, field_name: &str) -> ValueKind {
    tracked
        .field_kind(field_name)
        .cloned()
        .unwrap_or(ValueKind::Text)
}

/// Resolve both range bounds to UTC and validate their ordering
fn normalize_range(
    start: Option<TimeBound>,
    end: Option<TimeBound>,
    assumed_zone: Option<FixedOffset>,
) -> AuditResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let start = start.map(|bound| to_utc(bound, assumed_zone));
    let end = end.map(|bound| to_utc(bound, assumed_zone));

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(AuditError::InvalidDateRange);
        }
    }

    Ok((start, end))
}

fn to_utc(bound: TimeBound, assumed_zone: Option<FixedOffset>) -> DateTime<Utc> {
    match bound {
        TimeBound::Utc(dt) => dt,
        TimeBound::Naive(naive) => {
            warn!(
                bound = %naive,
                zone = ?assumed_zone,
                "timezone-naive date bound, interpreting in the assumed zone"
            );
            resolve_naive(naive, assumed_zone)
        }
    }
}

fn resolve_naive(naive: NaiveDateTime, assumed_zone: Option<FixedOffset>) -> DateTime<Utc> {
    let resolved = match assumed_zone {
        Some(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        None => Local
            .from_local_datetime(&naive)
            // A bound inside a DST gap takes the earlier interpretation
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    };
    resolved.unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_naive_bound_uses_assumed_zone() {
        let zone = FixedOffset::east_opt(9 * 3600).unwrap(); // UTC+9
        let utc = resolve_naive(naive(12), Some(zone));
        assert_eq!(utc, Utc.with_ymd_and_hms(2026, 3, 10, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_aware_bound_passes_through() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(to_utc(TimeBound::Utc(dt), None), dt);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let zone = FixedOffset::east_opt(0).unwrap();
        let err = normalize_range(
            Some(TimeBound::Naive(naive(12))),
            Some(TimeBound::Naive(naive(6))),
            Some(zone),
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_DATE_RANGE");
    }

    #[test]
    fn test_equal_bounds_are_a_valid_range() {
        let zone = FixedOffset::east_opt(0).unwrap();
        let (start, end) = normalize_range(
            Some(TimeBound::Naive(naive(12))),
            Some(TimeBound::Naive(naive(12))),
            Some(zone),
        )
        .unwrap();
        assert_eq!(start, end);
    }

    #[test]
    fn test_open_ended_ranges_pass_validation() {
        assert!(normalize_range(None, None, None).unwrap().0.is_none());
        let (start, end) = normalize_range(Some(TimeBound::Naive(naive(1))), None, None).unwrap();
        assert!(start.is_some());
        assert!(end.is_none());
    }
}

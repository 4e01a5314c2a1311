//! Audit session - owns the change buffer of one host transaction
//!
//! The host creates one session per unit of work, calls `observe` from its
//! before-commit hook (possibly several times when the unit of work flushes
//! in stages), and calls `flush` on its open transaction just before
//! committing. Dropping the session without flushing discards the buffered
//! changes, which is exactly right for a rolled-back transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use tracing::{debug, instrument, warn};

use audit_core::{
    detect_changes, AuditBuffer, AuditContext, AuditResult, AuditableInstance, BufferEntry,
    FailurePolicy, FlushSet, LogContext, Serializer, TrackedTableConfig, TrackingRegistry,
    ValueKind,
};
use audit_common::AuditConfig;

use crate::writer;

/// Change capture scoped to one host transaction
pub struct AuditSession {
    registry: Arc<TrackingRegistry>,
    serializer: Arc<Serializer>,
    config: AuditConfig,
    context: AuditContext,
    buffer: AuditBuffer,
}

impl AuditSession {
    pub fn new(
        registry: Arc<TrackingRegistry>,
        serializer: Arc<Serializer>,
        config: AuditConfig,
    ) -> Self {
        Self {
            registry,
            serializer,
            config,
            context: AuditContext::default(),
            buffer: AuditBuffer::new(),
        }
    }

    /// Attribution context applied to subsequently observed changes
    pub fn set_context(&mut self, context: AuditContext) {
        self.context = context;
    }

    pub fn context(&self) -> &AuditContext {
        &self.context
    }

    pub fn clear_context(&mut self) {
        self.context = AuditContext::default();
    }

    /// Number of buffered change sets awaiting flush
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Diff and buffer the host's working set
    ///
    /// Call from the host's before-commit hook, after the host has flushed
    /// its own writes so generated keys are populated. Instances of
    /// unregistered entity types are skipped with a diagnostic; they are
    /// not an error because a working set routinely mixes tracked and
    /// untracked types.
    pub fn observe(&mut self, flush_set: &FlushSet<'_>) -> AuditResult<()> {
        let observed_at = Utc::now();

        for instance in &flush_set.new {
            self.observe_instance(*instance, true, observed_at)?;
        }
        for instance in flush_set.updated() {
            self.observe_instance(*instance, false, observed_at)?;
        }

        Ok(())
    }

    fn observe_instance(
        &mut self,
        instance: &dyn AuditableInstance,
        is_new: bool,
        observed_at: DateTime<Utc>,
    ) -> AuditResult<()> {
        let entity_name = instance.entity_name().to_string();
        let Ok(tracked) = self.registry.get(&entity_name) else {
            debug!(entity = %entity_name, "entity type not registered for auditing, skipping");
            return Ok(());
        };

        let changes = detect_changes(
            instance,
            &tracked,
            &self.serializer,
            is_new,
            self.config.failure_policy,
        )?;
        let resource_id = self.capture_resource_id(instance, &tracked)?;

        let context = LogContext {
            timestamp: observed_at,
            changed_by: self.config.resolve_changed_by(&self.context),
            impersonated_by: self.context.impersonated_by.clone(),
            reason: self.context.reason.clone(),
        };

        self.buffer.add(BufferEntry {
            entity_name,
            resource_id,
            changes,
            context,
        });

        Ok(())
    }

    /// Serialized resource id of the instance, `None` when the id field is
    /// unset (the writer rejects such entries at flush time)
    fn capture_resource_id(
        &self,
        instance: &dyn AuditableInstance,
        tracked: &TrackedTableConfig,
    ) -> AuditResult<Option<String>> {
        let Some(value) = instance.field_value(&tracked.resource_id_field) else {
            return Ok(None);
        };
        let kind = tracked
            .field_kind(&tracked.resource_id_field)
            .cloned()
            .unwrap_or(ValueKind::Text);

        match self.serializer.serialize(&value, &kind) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) => match self.config.failure_policy {
                FailurePolicy::BestEffort => {
                    warn!(
                        entity = %tracked.schema.entity_name,
                        field = %tracked.resource_id_field,
                        error = %err,
                        "cannot serialize resource id"
                    );
                    Ok(None)
                }
                FailurePolicy::Strict => Err(err),
            },
        }
    }

    /// Persist the buffered changes on the caller's open transaction
    ///
    /// The buffer is emptied before any write is attempted, so a failed
    /// flush never leaves stale entries behind to leak into a retry.
    #[instrument(skip(self, txn), fields(pending = self.buffer.len()))]
    pub async fn flush(&mut self, txn: &mut Transaction<'_, Postgres>) -> AuditResult<()> {
        let groups = self.buffer.drain();

        for (entity_name, entries) in groups {
            let tracked = self.registry.get(&entity_name)?;
            writer::register_change(txn, &tracked, &entries).await?;
        }

        Ok(())
    }

    /// Drop buffered changes without writing them (rollback path)
    pub fn discard(&mut self) {
        self.buffer.clear();
    }
}

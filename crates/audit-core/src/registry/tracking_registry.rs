//! Tracking registry - process-wide map of entity types registered for auditing
//!
//! Registration happens at application startup and is fail-fast: an invalid
//! tracked-field list or an unsupported field type is rejected before any
//! data flows. After startup the registry is read-only and shared across
//! concurrent transactions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{AuditError, AuditResult};
use crate::schema::EntitySchema;
use crate::serializer::Serializer;
use crate::values::ValueKind;

/// Registration options for one entity type
#[derive(Debug, Clone, Default)]
pub struct TrackOptions {
    /// Fields to track; empty means all trackable fields
    pub tracked_fields: Vec<String>,
    /// Field holding the stable resource id; defaults to the primary key
    pub resource_id_field: Option<String>,
    /// Field holding the acting user's id, if the entity carries one
    pub user_id_field: Option<String>,
    /// Display label for the audit table (falls back to the table name)
    pub label: Option<String>,
}

/// Resolved, immutable audit configuration for one registered entity type
#[derive(Debug, Clone)]
pub struct TrackedTableConfig {
    pub schema: EntitySchema,
    /// Effective tracked-field set, resolved at registration
    pub tracked_fields: Vec<String>,
    pub resource_id_field: String,
    pub user_id_field: Option<String>,
    pub label: Option<String>,
}

impl TrackedTableConfig {
    /// Declared kind of a tracked field
    pub fn field_kind(&self, field: &str) -> Option<&ValueKind> {
        self.schema.field_def(field).map(|def| &def.kind)
    }

    /// Label if set, else the table name (the query-facing resource type)
    pub fn resource_type(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.schema.table_name)
    }
}

/// Process-wide registry of tracked entity types
///
/// Keyed by entity name; reads are concurrent, registration writes are
/// serialized behind a single writer lock.
#[derive(Debug, Default)]
pub struct TrackingRegistry {
    entries: RwLock<HashMap<String, Arc<TrackedTableConfig>>>,
}

impl TrackingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type for auditing
    ///
    /// Fails with `AlreadyRegistered` on duplicate registration, with
    /// `UnknownField` when a tracked field is not a trackable column, and
    /// with `UnsupportedFieldType` when a tracked field's declared kind has
    /// no serializer handler.
    pub fn register(
        &self,
        schema: EntitySchema,
        options: TrackOptions,
        serializer: &Serializer,
    ) -> AuditResult<()> {
        let mut entries = self.entries.write();

        if entries.contains_key(&schema.entity_name) {
            return Err(AuditError::AlreadyRegistered(schema.entity_name));
        }

        let trackable: Vec<String> = schema
            .trackable_fields()
            .map(|f| f.name.clone())
            .collect();
        if trackable.is_empty() {
            return Err(AuditError::NoTrackableFields(schema.entity_name));
        }

        for field in &options.tracked_fields {
            if !trackable.contains(field) {
                return Err(AuditError::UnknownField {
                    entity: schema.entity_name.clone(),
                    field: field.clone(),
                });
            }
        }

        // Empty tracked_fields means "track every trackable column"
        let tracked_fields = if options.tracked_fields.is_empty() {
            trackable
        } else {
            options.tracked_fields
        };

        for field in &tracked_fields {
            // Field presence was validated above
            if let Some(def) = schema.field_def(field) {
                if !serializer.has_handler(&def.kind) {
                    return Err(AuditError::UnsupportedFieldType {
                        entity: schema.entity_name.clone(),
                        field: field.clone(),
                        kind: def.kind.to_string(),
                    });
                }
            }
        }

        let resource_id_field = options
            .resource_id_field
            .unwrap_or_else(|| schema.primary_key.clone());
        if schema.field_def(&resource_id_field).is_none() {
            return Err(AuditError::UnknownField {
                entity: schema.entity_name.clone(),
                field: resource_id_field,
            });
        }

        if let Some(user_field) = &options.user_id_field {
            if schema.field_def(user_field).is_none() {
                return Err(AuditError::UnknownField {
                    entity: schema.entity_name.clone(),
                    field: user_field.clone(),
                });
            }
        }

        debug!(
            entity = %schema.entity_name,
            table = %schema.table_name,
            fields = ?tracked_fields,
            "registered entity type for auditing"
        );

        let entity_name = schema.entity_name.clone();
        entries.insert(
            entity_name,
            Arc::new(TrackedTableConfig {
                schema,
                tracked_fields,
                resource_id_field,
                user_id_field: options.user_id_field,
                label: options.label,
            }),
        );

        Ok(())
    }

    /// Look up the configuration for an entity type
    pub fn get(&self, entity_name: &str) -> AuditResult<Arc<TrackedTableConfig>> {
        self.entries
            .read()
            .get(entity_name)
            .cloned()
            .ok_or_else(|| AuditError::NotRegistered(entity_name.to_string()))
    }

    /// Check whether an entity type is registered; never fails
    pub fn contains(&self, entity_name: &str) -> bool {
        self.entries.read().contains_key(entity_name)
    }

    /// Look up the configuration by physical table name
    ///
    /// Used at retrieval time to resolve declared field kinds for stored
    /// audit rows.
    pub fn entry_for_table(&self, table_name: &str) -> AuditResult<Arc<TrackedTableConfig>> {
        self.entries
            .read()
            .values()
            .find(|cfg| cfg.schema.table_name == table_name)
            .cloned()
            .ok_or_else(|| AuditError::NotRegistered(table_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::TypeHandler;
    use crate::values::FieldValue;

    fn customer_schema() -> EntitySchema {
        EntitySchema::new("customer", "customers", "id")
            .field("id", ValueKind::Int)
            .field("name", ValueKind::Text)
            .field("email", ValueKind::Text)
            .field("age", ValueKind::Int)
            .relationship("orders")
    }

    #[test]
    fn test_register_and_get() {
        let registry = TrackingRegistry::new();
        let serializer = Serializer::new();
        registry
            .register(customer_schema(), TrackOptions::default(), &serializer)
            .unwrap();

        let config = registry.get("customer").unwrap();
        assert_eq!(config.resource_id_field, "id");
        assert_eq!(config.tracked_fields, vec!["id", "name", "email", "age"]);
        assert_eq!(config.resource_type(), "customers");
        assert!(registry.contains("customer"));
        assert!(!registry.contains("order"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = TrackingRegistry::new();
        let serializer = Serializer::new();
        registry
            .register(customer_schema(), TrackOptions::default(), &serializer)
            .unwrap();

        let err = registry
            .register(customer_schema(), TrackOptions::default(), &serializer)
            .unwrap_err();
        assert_eq!(err.code(), "ALREADY_REGISTERED");
    }

    #[test]
    fn test_unknown_tracked_field_rejected() {
        let registry = TrackingRegistry::new();
        let serializer = Serializer::new();
        let err = registry
            .register(
                customer_schema(),
                TrackOptions {
                    tracked_fields: vec!["bogus".into()],
                    ..TrackOptions::default()
                },
                &serializer,
            )
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_FIELD");
    }

    #[test]
    fn test_relationship_field_rejected() {
        let registry = TrackingRegistry::new();
        let serializer = Serializer::new();
        let err = registry
            .register(
                customer_schema(),
                TrackOptions {
                    tracked_fields: vec!["orders".into()],
                    ..TrackOptions::default()
                },
                &serializer,
            )
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_FIELD");
    }

    #[test]
    fn test_unsupported_field_type_rejected() {
        let registry = TrackingRegistry::new();
        let serializer = Serializer::new();
        let schema = EntitySchema::new("wallet", "wallets", "id")
            .field("id", ValueKind::Int)
            .field("balance", ValueKind::Custom("money".into()));

        let err = registry
            .register(schema, TrackOptions::default(), &serializer)
            .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_FIELD_TYPE");
    }

    #[test]
    fn test_custom_handler_makes_type_trackable() {
        let registry = TrackingRegistry::new();
        let serializer = Serializer::new();
        serializer.register_custom_handler(
            ValueKind::Custom("money".into()),
            TypeHandler::new(
                |v| match v {
                    FieldValue::Int(cents) => Ok(cents.to_string()),
                    other => Err(AuditError::Serialization {
                        kind: "money".into(),
                        message: format!("value has kind '{}'", other.kind()),
                    }),
                },
                |raw| Ok(FieldValue::Int(raw.parse().unwrap_or(0))),
            ),
        );

        let schema = EntitySchema::new("wallet", "wallets", "id")
            .field("id", ValueKind::Int)
            .field("balance", ValueKind::Custom("money".into()));
        registry
            .register(schema, TrackOptions::default(), &serializer)
            .unwrap();
        assert!(registry.contains("wallet"));
    }

    #[test]
    fn test_get_unregistered_fails() {
        let registry = TrackingRegistry::new();
        let err = registry.get("ghost").unwrap_err();
        assert_eq!(err.code(), "NOT_REGISTERED");
    }

    #[test]
    fn test_explicit_options() {
        let registry = TrackingRegistry::new();
        let serializer = Serializer::new();
        registry
            .register(
                customer_schema(),
                TrackOptions {
                    tracked_fields: vec!["email".into()],
                    resource_id_field: Some("email".into()),
                    user_id_field: None,
                    label: Some("Customer".into()),
                },
                &serializer,
            )
            .unwrap();

        let config = registry.get("customer").unwrap();
        assert_eq!(config.tracked_fields, vec!["email"]);
        assert_eq!(config.resource_id_field, "email");
        assert_eq!(config.resource_type(), "Customer");
    }

    #[test]
    fn test_entry_for_table() {
        let registry = TrackingRegistry::new();
        let serializer = Serializer::new();
        registry
            .register(customer_schema(), TrackOptions::default(), &serializer)
            .unwrap();

        let config = registry.entry_for_table("customers").unwrap();
        assert_eq!(config.schema.entity_name, "customer");
        assert!(registry.entry_for_table("missing").is_err());
    }
}

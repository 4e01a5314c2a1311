//! Audit errors - error types shared by every layer of the audit pipeline

use thiserror::Error;

/// Result type for audit operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors raised by the audit layer
#[derive(Debug, Error)]
pub enum AuditError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid audit configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Registration Errors
    // =========================================================================
    #[error("Entity type '{0}' is already registered for auditing")]
    AlreadyRegistered(String),

    #[error("Entity type '{0}' is not registered for auditing")]
    NotRegistered(String),

    #[error("Field '{field}' is not a trackable column of entity '{entity}' (is it a relationship?)")]
    UnknownField { entity: String, field: String },

    #[error("Field '{field}' of entity '{entity}' has type '{kind}' which no serializer handler covers")]
    UnsupportedFieldType {
        entity: String,
        field: String,
        kind: String,
    },

    #[error("Entity type '{0}' declares no trackable columns")]
    NoTrackableFields(String),

    // =========================================================================
    // Write Errors
    // =========================================================================
    #[error("Instance of '{entity}' has no value for resource-id field '{field}'")]
    MissingResourceId { entity: String, field: String },

    // =========================================================================
    // Retrieval Errors
    // =========================================================================
    #[error("No audit rows exist for table '{0}' (registered, but nothing recorded yet?)")]
    TableNotInAuditSchema(String),

    #[error("Filtering by user id requires user tracking to be configured")]
    UserFilterNotConfigured,

    #[error("Invalid date range: start is after end")]
    InvalidDateRange,

    #[error("Cannot sort audit records by '{0}'")]
    InvalidSortField(String),

    // =========================================================================
    // Serialization Errors
    // =========================================================================
    #[error("Cannot serialize value of type '{kind}': {message}")]
    Serialization { kind: String, message: String },

    #[error("Cannot deserialize '{value}' as type '{kind}': {message}")]
    Deserialization {
        kind: String,
        value: String,
        message: String,
    },

    // =========================================================================
    // Detection Errors (surfaced only under FailurePolicy::Strict)
    // =========================================================================
    #[error("Tracked field '{field}' is absent on instance of '{entity}'")]
    FieldNotOnInstance { entity: String, field: String },

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AuditError {
    /// Get an error code string for diagnostics and API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            Self::NotRegistered(_) => "NOT_REGISTERED",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
            Self::UnsupportedFieldType { .. } => "UNSUPPORTED_FIELD_TYPE",
            Self::NoTrackableFields(_) => "NO_TRACKABLE_FIELDS",
            Self::MissingResourceId { .. } => "MISSING_RESOURCE_ID",
            Self::TableNotInAuditSchema(_) => "TABLE_NOT_IN_AUDIT_SCHEMA",
            Self::UserFilterNotConfigured => "USER_FILTER_NOT_CONFIGURED",
            Self::InvalidDateRange => "INVALID_DATE_RANGE",
            Self::InvalidSortField(_) => "INVALID_SORT_FIELD",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
            Self::Deserialization { .. } => "DESERIALIZATION_ERROR",
            Self::FieldNotOnInstance { .. } => "FIELD_NOT_ON_INSTANCE",
            Self::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    /// Check if this error was raised at registration time
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRegistered(_)
                | Self::NotRegistered(_)
                | Self::UnknownField { .. }
                | Self::UnsupportedFieldType { .. }
                | Self::NoTrackableFields(_)
        )
    }

    /// Check if this error was raised while building or running a retrieval query
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            Self::TableNotInAuditSchema(_)
                | Self::UserFilterNotConfigured
                | Self::InvalidDateRange
                | Self::InvalidSortField(_)
        )
    }

    /// Check if this is a value conversion error
    pub fn is_serialization(&self) -> bool {
        matches!(
            self,
            Self::Serialization { .. } | Self::Deserialization { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AuditError::AlreadyRegistered("customer".to_string());
        assert_eq!(err.code(), "ALREADY_REGISTERED");

        let err = AuditError::UserFilterNotConfigured;
        assert_eq!(err.code(), "USER_FILTER_NOT_CONFIGURED");
    }

    #[test]
    fn test_is_registration() {
        assert!(AuditError::AlreadyRegistered("x".into()).is_registration());
        assert!(
            AuditError::UnknownField {
                entity: "customer".into(),
                field: "bogus".into(),
            }
            .is_registration()
        );
        assert!(!AuditError::UserFilterNotConfigured.is_registration());
    }

    #[test]
    fn test_is_retrieval() {
        assert!(AuditError::TableNotInAuditSchema("customers".into()).is_retrieval());
        assert!(AuditError::InvalidDateRange.is_retrieval());
        assert!(!AuditError::DatabaseError("x".into()).is_retrieval());
    }

    #[test]
    fn test_error_display() {
        let err = AuditError::MissingResourceId {
            entity: "customer".into(),
            field: "id".into(),
        };
        assert_eq!(
            err.to_string(),
            "Instance of 'customer' has no value for resource-id field 'id'"
        );
    }
}

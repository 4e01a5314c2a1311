//! Who/why metadata carried into each buffered change
//!
//! Context travels explicitly: the caller sets an `AuditContext` on its
//! audit session for the duration of a unit of work, and the session stamps
//! it (plus the capture timestamp) onto every buffered change as a
//! `LogContext`. There is no ambient thread-local state to leak between
//! transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied attribution for a unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    /// Identifier of the user performing the change
    pub changed_by: Option<String>,
    /// Brief description of why the change was made
    pub reason: Option<String>,
    /// Identifier of the user acting on behalf of `changed_by`
    pub impersonated_by: Option<String>,
}

impl AuditContext {
    pub fn new(
        changed_by: Option<impl Into<String>>,
        reason: Option<impl Into<String>>,
        impersonated_by: Option<impl Into<String>>,
    ) -> Self {
        Self {
            changed_by: changed_by.map(Into::into),
            reason: reason.map(Into::into),
            impersonated_by: impersonated_by.map(Into::into),
        }
    }

    /// Context attributing a change to one user
    pub fn by_user(user_id: impl Into<String>) -> Self {
        Self {
            changed_by: Some(user_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_impersonator(mut self, user_id: impl Into<String>) -> Self {
        self.impersonated_by = Some(user_id.into());
        self
    }
}

/// Attribution plus the capture timestamp, stamped onto buffered changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    pub timestamp: DateTime<Utc>,
    pub changed_by: Option<String>,
    pub impersonated_by: Option<String>,
    pub reason: Option<String>,
}

impl LogContext {
    /// Stamp an audit context with the current time
    pub fn capture(context: &AuditContext) -> Self {
        Self::capture_at(context, Utc::now())
    }

    pub fn capture_at(context: &AuditContext, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            changed_by: context.changed_by.clone(),
            impersonated_by: context.impersonated_by.clone(),
            reason: context.reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_is_anonymous() {
        let ctx = AuditContext::default();
        assert!(ctx.changed_by.is_none());
        assert!(ctx.reason.is_none());
        assert!(ctx.impersonated_by.is_none());
    }

    #[test]
    fn test_builder_style() {
        let ctx = AuditContext::by_user("admin-7")
            .with_reason("GDPR erasure request")
            .with_impersonator("support-2");
        assert_eq!(ctx.changed_by.as_deref(), Some("admin-7"));
        assert_eq!(ctx.reason.as_deref(), Some("GDPR erasure request"));
        assert_eq!(ctx.impersonated_by.as_deref(), Some("support-2"));
    }

    #[test]
    fn test_capture_stamps_timestamp() {
        let before = Utc::now();
        let log = LogContext::capture(&AuditContext::by_user("u1"));
        assert!(log.timestamp >= before && log.timestamp <= Utc::now());
        assert_eq!(log.changed_by.as_deref(), Some("u1"));
    }
}

//! Runtime configuration for the audit layer
//!
//! Built once at application startup and shared read-only afterwards.
//! Validation is fail-fast: an inconsistent user-tracking setup is rejected
//! at construction, before any audit data flows.

use std::fmt;
use std::sync::Arc;

use chrono::FixedOffset;

use audit_core::{AuditContext, AuditError, AuditResult, FailurePolicy};

/// Resolves the current user's id when the caller's context leaves
/// `changed_by` unset
pub type UserIdCallback = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// User attribution setup: which field identifies users, and how to resolve
/// the acting user when no context names one
#[derive(Clone)]
pub struct UserTracking {
    /// Field on the host's user model that stores the user id
    pub user_id_field: String,
    pub callback: UserIdCallback,
}

impl UserTracking {
    pub fn new(user_id_field: impl Into<String>, callback: UserIdCallback) -> AuditResult<Self> {
        let user_id_field = user_id_field.into();
        if user_id_field.is_empty() {
            return Err(AuditError::InvalidConfig(
                "user_id_field must be a non-empty field name when user tracking is enabled"
                    .to_string(),
            ));
        }
        Ok(Self {
            user_id_field,
            callback,
        })
    }
}

impl fmt::Debug for UserTracking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserTracking")
            .field("user_id_field", &self.user_id_field)
            .finish_non_exhaustive()
    }
}

/// Process-wide audit configuration
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    /// User attribution; `None` disables the user filter on retrieval
    pub user_tracking: Option<UserTracking>,
    /// Zone assumed for timezone-naive date-range bounds; `None` means the
    /// system's local zone
    pub timezone: Option<FixedOffset>,
    /// How detection-time failures are handled
    pub failure_policy: FailurePolicy,
}

impl AuditConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user_tracking(mut self, tracking: UserTracking) -> Self {
        self.user_tracking = Some(tracking);
        self
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = Some(timezone);
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Whether audit logs carry user attribution that can be filtered on
    pub fn logs_users(&self) -> bool {
        self.user_tracking.is_some()
    }

    /// Resolve the acting user: explicit context first, configured callback
    /// as fallback
    pub fn resolve_changed_by(&self, context: &AuditContext) -> Option<String> {
        context.changed_by.clone().or_else(|| {
            self.user_tracking
                .as_ref()
                .and_then(|tracking| (tracking.callback)())
        })
    }
}

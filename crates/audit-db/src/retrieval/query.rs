//! Query parameters for change-history retrieval

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use audit_core::{AuditError, AuditResult};

/// A resource id filter value
///
/// Resource ids are stored in canonical text form, so integer and UUID
/// filters are coerced to their text rendering before matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceIdFilter {
    Text(String),
    Int(i64),
    Uuid(Uuid),
}

impl ResourceIdFilter {
    /// The stored text form this filter matches against
    pub fn canonical(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Uuid(u) => u.to_string(),
        }
    }
}

impl From<&str> for ResourceIdFilter {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ResourceIdFilter {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ResourceIdFilter {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ResourceIdFilter {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<Uuid> for ResourceIdFilter {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

/// A date-range bound, timezone-aware or naive
///
/// Naive bounds are interpreted in the configured assumed zone (or the
/// system's local zone) at query time, with a diagnostic warning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeBound {
    Utc(DateTime<Utc>),
    Naive(NaiveDateTime),
}

impl From<DateTime<Utc>> for TimeBound {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Utc(value)
    }
}

impl From<NaiveDateTime> for TimeBound {
    fn from(value: NaiveDateTime) -> Self {
        Self::Naive(value)
    }
}

/// Column the result set is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Timestamp,
    ResourceId,
    ChangedBy,
    RecordId,
}

impl SortField {
    /// Parse a caller-supplied sort field name
    pub fn parse(name: &str) -> AuditResult<Self> {
        match name {
            "timestamp" => Ok(Self::Timestamp),
            "resource_id" => Ok(Self::ResourceId),
            "changed_by" => Ok(Self::ChangedBy),
            "record_id" => Ok(Self::RecordId),
            other => Err(AuditError::InvalidSortField(other.to_string())),
        }
    }

    /// The whitelisted column this sorts on; never caller-controlled text
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Timestamp => "l.timestamp",
            Self::ResourceId => "l.resource_id",
            Self::ChangedBy => "l.changed_by",
            Self::RecordId => "l.record_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    /// Newest first
    #[default]
    Desc,
}

impl SortDirection {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filter, sort, and pagination parameters for one retrieval call
///
/// The default query matches every record of the entity type, newest
/// first, unpaginated.
#[derive(Debug, Clone, Default)]
pub struct ChangeQuery {
    /// Restrict to these resource ids; empty means all
    pub resource_ids: Vec<ResourceIdFilter>,
    /// Restrict to changes of these fields; empty means all tracked fields
    pub field_names: Vec<String>,
    /// Inclusive lower bound on the change timestamp
    pub start: Option<TimeBound>,
    /// Inclusive upper bound on the change timestamp
    pub end: Option<TimeBound>,
    /// Restrict to changes made by these users; requires user tracking
    pub user_ids: Vec<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: SortField,
    pub sort_direction: SortDirection,
}

impl ChangeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn resource_id(mut self, id: impl Into<ResourceIdFilter>) -> Self {
        self.resource_ids.push(id.into());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.field_names.push(name.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_ids.push(user_id.into());
        self
    }

    #[must_use]
    pub fn since(mut self, bound: impl Into<TimeBound>) -> Self {
        self.start = Some(bound.into());
        self
    }

    #[must_use]
    pub fn until(mut self, bound: impl Into<TimeBound>) -> Self {
        self.end = Some(bound.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn sort(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort_by = field;
        self.sort_direction = direction;
        self
    }

    /// Resource id filters in stored text form, empty strings dropped
    pub(crate) fn canonical_resource_ids(&self) -> Vec<String> {
        self.resource_ids
            .iter()
            .map(ResourceIdFilter::canonical)
            .filter(|id| !id.is_empty())
            .collect()
    }
}

//! The interface boundary with the host persistence layer
//!
//! The host's unit of work is not reimplemented here; it is consumed
//! through two capabilities it must expose at flush time: the set of
//! new/dirty/deleted instances (`FlushSet`) and, per tracked field, the
//! before/after history accumulated since the last flush (`FieldHistory`).

use crate::values::FieldValue;

/// Per-field change history since the last flush
///
/// Mirrors the three buckets a unit-of-work history API reports: values
/// newly assigned (`added`), values displaced (`deleted`), and the current
/// value when nothing changed (`unchanged`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldHistory {
    pub added: Vec<FieldValue>,
    pub deleted: Vec<FieldValue>,
    pub unchanged: Vec<FieldValue>,
}

impl FieldHistory {
    /// History for a field that was not touched
    pub fn unchanged(value: impl Into<FieldValue>) -> Self {
        Self {
            unchanged: vec![value.into()],
            ..Self::default()
        }
    }

    /// History for a field assigned a value with no prior state (insert,
    /// or an update filling a previously null column)
    pub fn set(value: impl Into<FieldValue>) -> Self {
        Self {
            added: vec![value.into()],
            ..Self::default()
        }
    }

    /// History for a field changed from one value to another
    pub fn modified(old: impl Into<FieldValue>, new: impl Into<FieldValue>) -> Self {
        Self {
            added: vec![new.into()],
            deleted: vec![old.into()],
            unchanged: Vec::new(),
        }
    }

    /// History for a field whose value was cleared to null
    pub fn cleared(old: impl Into<FieldValue>) -> Self {
        Self {
            deleted: vec![old.into()],
            ..Self::default()
        }
    }

    /// History for a field that is null and was not touched
    pub fn absent() -> Self {
        Self::default()
    }

    /// Whether the host reported any change for this field
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.deleted.is_empty()
    }

    /// The after state: first of added then unchanged
    pub fn new_state(&self) -> Option<&FieldValue> {
        self.added.first().or_else(|| self.unchanged.first())
    }

    /// The before state: first of deleted then unchanged
    pub fn old_state(&self) -> Option<&FieldValue> {
        self.deleted.first().or_else(|| self.unchanged.first())
    }
}

/// An in-flight entity instance as the host exposes it to the audit layer
pub trait AuditableInstance {
    /// The registered entity type name of this instance
    fn entity_name(&self) -> &str;

    /// Current value of a field, if present and non-null
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// Change history of a field, or `None` when the field does not exist
    /// on this instance
    fn field_history(&self, field: &str) -> Option<FieldHistory>;
}

/// The host's working set at the before-commit hook point
#[derive(Default)]
pub struct FlushSet<'a> {
    /// Instances inserted in this transaction
    pub new: Vec<&'a dyn AuditableInstance>,
    /// Persisted instances with pending modifications
    pub dirty: Vec<&'a dyn AuditableInstance>,
    /// Instances marked for deletion
    pub deleted: Vec<&'a dyn AuditableInstance>,
}

impl<'a> FlushSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_new(mut self, instance: &'a dyn AuditableInstance) -> Self {
        self.new.push(instance);
        self
    }

    #[must_use]
    pub fn with_dirty(mut self, instance: &'a dyn AuditableInstance) -> Self {
        self.dirty.push(instance);
        self
    }

    #[must_use]
    pub fn with_deleted(mut self, instance: &'a dyn AuditableInstance) -> Self {
        self.deleted.push(instance);
        self
    }

    /// Dirty and deleted instances (everything diffed against persisted state)
    pub fn updated(&self) -> impl Iterator<Item = &&'a dyn AuditableInstance> {
        self.dirty.iter().chain(self.deleted.iter())
    }
}

//! Change buffer scoped to one in-flight transaction
//!
//! The buffer belongs to one `AuditSession` and therefore to one host
//! transaction. It is never shared: two concurrent transactions each hold
//! their own buffer, so neither can observe the other's changes. Entries
//! accumulate across flush cycles within the transaction and are drained
//! (grouped by entity type, order preserved) once the host commits.

use crate::context::LogContext;
use crate::entities::FieldChange;

/// One buffered change set: a single instance observed in one flush cycle
#[derive(Debug, Clone)]
pub struct BufferEntry {
    pub entity_name: String,
    /// Serialized resource id, captured at observe time (generated keys are
    /// present because the host has already flushed its own writes)
    pub resource_id: Option<String>,
    pub changes: Vec<FieldChange>,
    pub context: LogContext,
}

/// Per-transaction accumulation of buffer entries, grouped by entity type
#[derive(Debug, Default)]
pub struct AuditBuffer {
    groups: Vec<(String, Vec<BufferEntry>)>,
}

impl AuditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; entries for the same entity type accumulate in order
    pub fn add(&mut self, entry: BufferEntry) {
        if let Some((_, entries)) = self
            .groups
            .iter_mut()
            .find(|(name, _)| *name == entry.entity_name)
        {
            entries.push(entry);
        } else {
            self.groups.push((entry.entity_name.clone(), vec![entry]));
        }
    }

    /// Take all buffered groups, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<(String, Vec<BufferEntry>)> {
        std::mem::take(&mut self.groups)
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Number of buffered entries across all entity types
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

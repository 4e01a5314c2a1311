//! Entity schema - the column description an entity type supplies at registration
//!
//! The host persistence layer describes each tracked entity type once, up
//! front: field names, declared value kinds, and which columns are
//! relationships. The registry caches this description; nothing inspects
//! instances at runtime to discover columns.

use serde::{Deserialize, Serialize};

use crate::values::ValueKind;

/// One column of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: ValueKind,
    /// Relationship/association columns are never trackable
    pub relationship: bool,
}

/// Column-level description of one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Logical entity type name (registry key)
    pub entity_name: String,
    /// Physical table name in the host schema
    pub table_name: String,
    /// Primary key field, the default resource id
    pub primary_key: String,
    pub fields: Vec<FieldDef>,
}

impl EntitySchema {
    /// Start a schema description with no fields
    pub fn new(
        entity_name: impl Into<String>,
        table_name: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            table_name: table_name.into(),
            primary_key: primary_key.into(),
            fields: Vec::new(),
        }
    }

    /// Add a scalar column
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
            relationship: false,
        });
        self
    }

    /// Add a relationship column (excluded from tracking by construction)
    #[must_use]
    pub fn relationship(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind: ValueKind::Text,
            relationship: true,
        });
        self
    }

    /// All columns that may be tracked (everything except relationships)
    pub fn trackable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.relationship)
    }

    /// Look up a column by name
    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trackable_excludes_relationships() {
        let schema = EntitySchema::new("customer", "customers", "id")
            .field("id", ValueKind::Int)
            .field("email", ValueKind::Text)
            .relationship("orders");

        let trackable: Vec<&str> = schema.trackable_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(trackable, vec!["id", "email"]);
        assert!(schema.field_def("orders").unwrap().relationship);
    }
}

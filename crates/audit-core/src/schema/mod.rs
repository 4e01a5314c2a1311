//! Entity schema descriptors

mod entity_schema;

pub use entity_schema::{EntitySchema, FieldDef};

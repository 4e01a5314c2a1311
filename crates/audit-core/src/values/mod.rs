//! Canonical field values

mod field_value;

pub use field_value::{FieldValue, ValueKind};

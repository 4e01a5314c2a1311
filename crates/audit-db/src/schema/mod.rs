//! Audit schema bootstrap

mod bootstrap;

pub use bootstrap::{ensure_schema, table_exists};

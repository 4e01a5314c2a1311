//! Audit writer - persists buffered changes inside the host transaction

mod audit_writer;

pub use audit_writer::register_change;

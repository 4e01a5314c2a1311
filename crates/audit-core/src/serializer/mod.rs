//! Value serializer - canonical string forms for tracked field values

mod handlers;

pub use handlers::{Serializer, TypeHandler};

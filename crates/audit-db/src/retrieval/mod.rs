//! Retrieval engine - reconstructs change history from stored audit rows

mod engine;
mod query;

pub use engine::RetrievalEngine;
pub use query::{ChangeQuery, ResourceIdFilter, SortDirection, SortField, TimeBound};

//! Tracking registry

mod tracking_registry;

pub use tracking_registry::{TrackOptions, TrackedTableConfig, TrackingRegistry};

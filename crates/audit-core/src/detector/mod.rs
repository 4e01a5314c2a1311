//! Change detector - diffs in-flight state against persisted state

mod change_detector;
mod history;

pub use change_detector::{detect_changes, FailurePolicy};
pub use history::{AuditableInstance, FieldHistory, FlushSet};

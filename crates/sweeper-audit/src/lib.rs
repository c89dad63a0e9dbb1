//! SQLite-backed audit trail for the cleanup daemon (spec.md §4.5).
//!
//! Every Cleaner decision (DELETE, DRY_RUN, SKIP, ERROR) is appended as one
//! row. Grounded on this codebase's session-writer's schema-versioned,
//! WAL-journaled SQLite setup.

mod store;

pub use store::{AuditStats, AuditStore};

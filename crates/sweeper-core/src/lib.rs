//! Storage Sage Core Types and Errors
//!
//! This crate provides the fundamental types shared across the cleanup daemon:
//!
//! - [`config`]: `PathRule` / `GlobalConfig`, the user-facing policy schema.
//! - [`model`]: `Candidate`, `DeletionReason`, `AuditRecord` — the data that flows
//!   between the Scanner, Cleaner, and Audit Store.
//! - [`error`]: the crate-wide error taxonomy.
//! - [`time`]: small helpers for age computation that keep `now` fixed per cycle.
//!
//! ```text
//! ┌──────────────┐     ┌──────────┐     ┌─────────┐     ┌────────────┐
//! │ GlobalConfig │────▶│ Scanner  │────▶│ Cleaner │────▶│ AuditStore │
//! │  PathRule    │     │Candidate │     │         │     │AuditRecord │
//! └──────────────┘     └──────────┘     └─────────┘     └────────────┘
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod time;

pub use config::{CleanupOptions, GlobalConfig, PathRule, ResourceLimits};
pub use error::{Error, Result};
pub use model::{Action, AuditRecord, Candidate, DeletionReason, Mode, ObjectType};

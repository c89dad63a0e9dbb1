//! Configuration loading and hot-reload for the cleanup daemon (spec.md §3, §10.2).
//!
//! Configuration is parsed from YAML or TOML on disk into `GlobalConfig`,
//! validated, and defaults are filled in. [`watch`] follows the same
//! file-watcher-in-a-blocking-task shape this codebase's config store uses,
//! bridged into an async stream the Scheduler polls between cycles.

mod loader;
mod watcher;

pub use loader::load;
pub use watcher::watch;

//! Cleanup engine: the delete capability, the Cleaner (spec.md §4.4), and
//! the Scheduler that drives cycles (spec.md §4.6).

pub mod cleaner;
pub mod remover;
pub mod scheduler;

pub use cleaner::{CleanOutcome, Cleaner};
pub use remover::{OsRemover, Remover};
pub use scheduler::{Scheduler, SchedulerControl, SchedulerHandle};

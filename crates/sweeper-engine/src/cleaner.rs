//! Cleaner (spec.md §4.4): consumes scanner output, re-validates each target,
//! performs (or simulates) the delete, and appends an audit record.

use crate::remover::Remover;
use std::path::Path;
use std::time::Duration;
use sweeper_audit::AuditStore;
use sweeper_core::model::{Action, AuditRecord};
use sweeper_core::{Candidate, CleanupOptions};
use sweeper_observability::Metrics;
use sweeper_probe::DiskProbe;
use sweeper_validator::SafetyValidator;

/// Result of one cleaning pass: number of successful deletes and total bytes
/// freed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanOutcome {
    pub success_count: u64,
    pub total_freed: u64,
    pub error_count: u64,
}

pub struct Cleaner<R: Remover> {
    validator: SafetyValidator,
    probe: DiskProbe,
    remover: R,
    options: CleanupOptions,
    nfs_timeout: Option<Duration>,
    dry_run: bool,
}

impl<R: Remover> Cleaner<R> {
    pub fn new(
        validator: SafetyValidator,
        probe: DiskProbe,
        remover: R,
        options: CleanupOptions,
        nfs_timeout: Option<Duration>,
        dry_run: bool,
    ) -> Self {
        Self { validator, probe, remover, options, nfs_timeout, dry_run }
    }

    /// Consumes a slice of candidates, already sorted by `mtime` ascending
    /// (spec.md §5 ordering guarantee). Appends one `AuditRecord` per
    /// candidate and returns the aggregate outcome.
    pub async fn clean(&self, candidates: &[Candidate], audit: &AuditStore, metrics: Option<&Metrics>) -> CleanOutcome {
        let mut outcome = CleanOutcome::default();

        for candidate in candidates {
            self.clean_one(candidate, audit, metrics, &mut outcome).await;
        }

        outcome
    }

    async fn clean_one(&self, candidate: &Candidate, audit: &AuditStore, metrics: Option<&Metrics>, outcome: &mut CleanOutcome) {
        let raw_path = candidate.path.to_string_lossy().into_owned();

        if let Err(e) = self.validator.validate(&raw_path) {
            outcome.error_count += 1;
            tracing::warn!(path = %candidate.path.display(), error = %e, "unsafe path, skipping");
            self.append(candidate, Action::Skip, Some(format!("unsafe_path: {e}")), audit).await;
            if let Some(m) = metrics {
                m.record_skip();
            }
            return;
        }

        if let Some(timeout) = self.nfs_timeout {
            if self.probe.is_stale(&candidate.path, timeout).await {
                tracing::warn!(path = %candidate.path.display(), "stale mount, skipping");
                self.append(candidate, Action::Skip, Some("nfs_stale".to_string()), audit).await;
                if let Some(m) = metrics {
                    m.record_skip();
                }
                return;
            }
        }

        if candidate.is_dir && !self.options.delete_dirs {
            tracing::debug!(path = %candidate.path.display(), "delete_dirs disabled, skipping");
            self.append(candidate, Action::Skip, Some("delete_dirs_disabled".to_string()), audit).await;
            if let Some(m) = metrics {
                m.record_skip();
            }
            return;
        }

        if self.dry_run {
            tracing::info!(path = %candidate.path.display(), "dry-run: would delete");
            self.append(candidate, Action::DryRun, None, audit).await;
            if let Some(m) = metrics {
                m.record_dry_run();
            }
            return;
        }

        let delete_result = self.perform_delete(candidate);

        match delete_result {
            Ok(()) => {
                outcome.success_count += 1;
                outcome.total_freed += candidate.size;
                self.append(candidate, Action::Delete, None, audit).await;
                if let Some(m) = metrics {
                    m.record_delete(candidate.size);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Raced with another deleter; not an error (spec.md §4.4 step 5).
                tracing::debug!(path = %candidate.path.display(), "already gone, no record");
            }
            Err(_) if self.is_now_stale(&candidate.path).await => {
                self.append(candidate, Action::Skip, Some("nfs_stale_during_delete".to_string()), audit).await;
                if let Some(m) = metrics {
                    m.record_skip();
                }
            }
            Err(e) => {
                outcome.error_count += 1;
                tracing::warn!(path = %candidate.path.display(), error = %e, "delete failed");
                self.append(candidate, Action::Error, Some(e.to_string()), audit).await;
                if let Some(m) = metrics {
                    m.record_error();
                }
            }
        }
    }

    fn perform_delete(&self, candidate: &Candidate) -> std::io::Result<()> {
        if !candidate.is_dir {
            return self.remover.remove_file(&candidate.path);
        }

        if candidate.is_empty_dir {
            return self.remover.remove_empty_dir(&candidate.path);
        }

        if self.options.recursive {
            self.remover.remove_recursive(&candidate.path)
        } else {
            // Removing a non-empty directory without `recursive` surfaces as
            // an ERROR rather than silently skipping.
            self.remover.remove_empty_dir(&candidate.path)
        }
    }

    async fn is_now_stale(&self, path: &Path) -> bool {
        match self.nfs_timeout {
            Some(timeout) => self.probe.is_stale(path, timeout).await,
            None => false,
        }
    }

    async fn append(&self, candidate: &Candidate, action: Action, error_message: Option<String>, audit: &AuditStore) {
        let record = AuditRecord::from_candidate(candidate, action, error_message);
        if let Err(e) = audit.append(record).await {
            tracing::warn!(error = %e, "audit append failed, continuing cleanup");
        }
    }
}

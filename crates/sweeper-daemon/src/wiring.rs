//! Builds the Scanner/Cleaner/Scheduler/Metrics stack from a loaded
//! `GlobalConfig` (spec.md §5: "construction flows one-way: config →
//! components → scheduler").

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sweeper_audit::AuditStore;
use sweeper_core::{Error, GlobalConfig, Result};
use sweeper_engine::{Cleaner, OsRemover, Scheduler, SchedulerControl};
use sweeper_observability::{CycleControl, CycleReadiness, Metrics};
use sweeper_probe::DiskProbe;
use sweeper_scanner::Scanner;
use sweeper_validator::SafetyValidator;

/// Backs the `/trigger` and `/reload` HTTP hooks (spec.md §6) with the
/// running Scheduler's trigger/reload channels. `reload` re-reads the
/// configuration file itself rather than taking a `GlobalConfig` parameter,
/// since the HTTP handler has no config value of its own to hand it — the
/// same re-read-on-demand shape the reload OS signal uses.
pub struct DaemonControl {
    pub scheduler: SchedulerControl,
    pub config_path: PathBuf,
}

impl CycleControl for DaemonControl {
    fn trigger(&self) {
        self.scheduler.trigger();
    }

    fn reload(&self) {
        match sweeper_config::load(&self.config_path) {
            Ok(config) => self.scheduler.reload(config.effective_rules()),
            Err(e) => tracing::warn!(error = %e, "HTTP reload request ignored: configuration file is invalid"),
        }
    }
}

pub struct Components {
    pub scheduler: Scheduler<OsRemover>,
    pub metrics: Arc<Metrics>,
    pub readiness: Arc<CycleReadiness>,
    pub health_bind_addr: String,
}

pub async fn build(config: &GlobalConfig, dry_run: bool) -> Result<Components> {
    let rules = config.effective_rules();
    let allowed_roots: Vec<_> = rules.iter().map(|r| r.path.clone()).collect();

    let validator = SafetyValidator::new(allowed_roots, config.extra_protected_paths.clone());
    let scanner = Scanner::new(DiskProbe::new());
    let probe = DiskProbe::new();
    let nfs_timeout = Duration::from_secs(config.nfs_timeout_seconds);

    let audit = AuditStore::open(&config.database_path).await?;

    let metrics = Arc::new(Metrics::new().map_err(|e| Error::Config(format!("failed to initialize metrics registry: {e}")))?);

    let cleaner = Cleaner::new(validator, DiskProbe::new(), OsRemover, config.cleanup_options.clone(), Some(nfs_timeout), dry_run);

    let interval = Duration::from_secs(config.interval_minutes as u64 * 60);
    let scheduler = Scheduler::new(rules, scanner, probe, cleaner, audit, Some(metrics.clone()), interval, nfs_timeout);

    Ok(Components {
        scheduler,
        metrics,
        readiness: Arc::new(CycleReadiness::new(false)),
        health_bind_addr: config.health_bind_addr.clone(),
    })
}

//! Scheduler (spec.md §4.6): drives periodic cleanup cycles, exposes a
//! manual-trigger hook, and shuts down gracefully.
//!
//! Grounded on this codebase's session-cleanup background task: a
//! `tokio::select!` loop racing a shutdown signal against a timer, returning
//! a handle the caller can use to stop it. Generalized here with a second,
//! coalescing manual-trigger channel and per-cycle mode/metrics bookkeeping.

use crate::cleaner::Cleaner;
use crate::remover::Remover;
use std::sync::Arc;
use std::time::Duration;
use sweeper_audit::AuditStore;
use sweeper_core::model::Mode;
use sweeper_core::PathRule;
use sweeper_observability::Metrics;
use sweeper_probe::DiskProbe;
use sweeper_scanner::Scanner;
use tokio::sync::mpsc;

pub struct Scheduler<R: Remover> {
    rules: tokio::sync::RwLock<Vec<PathRule>>,
    scanner: Scanner,
    probe: DiskProbe,
    cleaner: Arc<Cleaner<R>>,
    audit: AuditStore,
    metrics: Option<Arc<Metrics>>,
    interval: Duration,
    nfs_timeout: Duration,
}

/// Handle to a running Scheduler: trigger an out-of-cycle run, push a
/// reloaded rule set, or shut it down.
pub struct SchedulerHandle {
    trigger_tx: mpsc::Sender<()>,
    reload_tx: mpsc::Sender<Vec<PathRule>>,
    shutdown_tx: mpsc::Sender<()>,
    join: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Requests an immediate cycle. Coalesced: if a trigger is already
    /// pending, this is a no-op rather than queuing a second one.
    pub fn trigger(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    /// Replaces the rule set the Scheduler reads at the start of its next
    /// cycle. Never applied mid-cycle (spec.md §10.2 / §4.6 "Shared
    /// resources"). Coalesced the same way `trigger` is: a pending reload
    /// that hasn't been picked up yet is overwritten, not queued.
    pub fn reload(&self, rules: Vec<PathRule>) {
        let _ = self.reload_tx.try_send(rules);
    }

    /// Signals the scheduler to finish its in-flight cycle (if any) and
    /// stop, then waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.join.await;
    }

    /// A cheap, `Clone`-able subset of this handle: just the trigger/reload
    /// senders, without the one-shot `shutdown`/`join`. Lets a caller hand
    /// trigger/reload access to something like an HTTP handler without also
    /// giving it the ability to stop the scheduler.
    pub fn control(&self) -> SchedulerControl {
        SchedulerControl { trigger_tx: self.trigger_tx.clone(), reload_tx: self.reload_tx.clone() }
    }
}

#[derive(Clone)]
pub struct SchedulerControl {
    trigger_tx: mpsc::Sender<()>,
    reload_tx: mpsc::Sender<Vec<PathRule>>,
}

impl SchedulerControl {
    pub fn trigger(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    pub fn reload(&self, rules: Vec<PathRule>) {
        let _ = self.reload_tx.try_send(rules);
    }
}

impl<R: Remover + Send + Sync + 'static> Scheduler<R> {
    pub fn new(
        rules: Vec<PathRule>,
        scanner: Scanner,
        probe: DiskProbe,
        cleaner: Cleaner<R>,
        audit: AuditStore,
        metrics: Option<Arc<Metrics>>,
        interval: Duration,
        nfs_timeout: Duration,
    ) -> Self {
        Self {
            rules: tokio::sync::RwLock::new(rules),
            scanner,
            probe,
            cleaner: Arc::new(cleaner),
            audit,
            metrics,
            interval,
            nfs_timeout,
        }
    }

    /// Spawns the cycle loop as a background task and returns a handle to
    /// control it. `on_cycle_complete` is invoked after each cycle (used to
    /// flip the readiness flag on the first run).
    pub fn spawn<F>(self, on_cycle_complete: F) -> SchedulerHandle
    where
        F: Fn() + Send + 'static,
    {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);
        let (reload_tx, mut reload_rx) = mpsc::channel::<Vec<PathRule>>(1);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let join = tokio::spawn(async move {
            tracing::info!(interval_secs = self.interval.as_secs(), "scheduler starting");

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("scheduler shutting down");
                        break;
                    }
                    Some(new_rules) = reload_rx.recv() => {
                        let count = new_rules.len();
                        *self.rules.write().await = new_rules;
                        tracing::info!(rule_count = count, "scheduler applied reloaded rules");
                    }
                    _ = trigger_rx.recv() => {
                        self.run_cycle_logged().await;
                        on_cycle_complete();
                    }
                    _ = tokio::time::sleep(self.interval) => {
                        self.run_cycle_logged().await;
                        on_cycle_complete();
                    }
                }
            }
        });

        SchedulerHandle { trigger_tx, reload_tx, shutdown_tx, join }
    }

    async fn run_cycle_logged(&self) {
        match self.run_cycle().await {
            Ok(outcome) => {
                tracing::info!(
                    deleted = outcome.success_count,
                    freed_bytes = outcome.total_freed,
                    errors = outcome.error_count,
                    "cleanup cycle complete"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "cleanup cycle failed, continuing scheduler");
            }
        }
    }

    /// Runs one full cycle: determine mode, scan, clean, record metrics.
    /// A single cycle's failure is isolated — it never stops the scheduler.
    pub async fn run_cycle(&self) -> sweeper_core::Result<crate::cleaner::CleanOutcome> {
        let start = std::time::Instant::now();
        let now = chrono::Utc::now();

        let rules = self.rules.read().await.clone();

        let mode = self.determine_mode(&rules).await;
        if let Some(metrics) = &self.metrics {
            metrics.set_current_mode(mode);
        }

        let candidates = self.scanner.scan_all(&rules, now, self.nfs_timeout).await;
        let outcome = self.cleaner.clean(&candidates, &self.audit, self.metrics.as_deref()).await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_cycle_duration(start.elapsed().as_secs_f64());
        }

        Ok(outcome)
    }

    /// The cycle's advisory operating mode (spec.md §4.6): the highest-
    /// precedence mode (STACK > DISK > AGE) reached by any monitored path.
    async fn determine_mode(&self, rules: &[PathRule]) -> Mode {
        let mut best = Mode::Unknown;

        for rule in rules {
            let usage = match self.probe.usage(&rule.path) {
                Ok(u) => u,
                Err(_) => continue,
            };
            if let Some(metrics) = &self.metrics {
                metrics.set_capacity(&rule.path.display().to_string(), usage.used_percent);
            }

            let rule_mode = if usage.used_percent >= rule.stack_threshold {
                Mode::Stack
            } else if usage.used_percent >= rule.max_free_percent {
                Mode::Disk
            } else if rule.age_off_days > 0 {
                Mode::Age
            } else {
                Mode::Unknown
            };

            best = higher_precedence(best, rule_mode);
        }

        best
    }
}

fn mode_rank(mode: Mode) -> u8 {
    match mode {
        Mode::Stack => 3,
        Mode::Disk => 2,
        Mode::Age => 1,
        Mode::Unknown => 0,
    }
}

fn higher_precedence(a: Mode, b: Mode) -> Mode {
    if mode_rank(b) > mode_rank(a) {
        b
    } else {
        a
    }
}

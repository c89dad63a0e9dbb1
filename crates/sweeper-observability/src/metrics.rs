//! Prometheus metrics for the cleanup daemon (spec.md §6, §10.4).

use prometheus::{CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, Opts, Registry};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    /// Keyed by `action` (DELETE/DRY_RUN/SKIP/ERROR) and `mode` (AGE/DISK/STACK/UNKNOWN).
    pub decisions_total: CounterVec,
    pub bytes_freed_total: prometheus::Counter,
    /// Keyed by monitored path.
    pub capacity_used_percent: GaugeVec,
    pub cycle_duration_seconds: Histogram,
    pub last_run_timestamp: Gauge,
    /// 0=AGE, 1=DISK, 2=STACK, 3=UNKNOWN.
    pub current_mode: Gauge,
}

impl Metrics {
    /// Registers every metric explicitly against a fresh registry — never a
    /// lazily-initialized global.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let decisions_total = CounterVec::new(
            Opts::new("sweeper_decisions_total", "Cleaner decisions by action and mode"),
            &["action", "mode"],
        )?;

        let bytes_freed_total = prometheus::Counter::new("sweeper_bytes_freed_total", "Total bytes freed by successful deletes")?;

        let capacity_used_percent = GaugeVec::new(
            Opts::new("sweeper_capacity_used_percent", "Filesystem capacity used, per monitored path"),
            &["path"],
        )?;

        let cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("sweeper_cycle_duration_seconds", "Scheduler cycle duration in seconds")
                .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        )?;

        let last_run_timestamp = Gauge::new("sweeper_last_run_timestamp", "Unix timestamp of the last completed cycle")?;

        let current_mode = Gauge::new("sweeper_current_mode", "Current operating mode (0=AGE, 1=DISK, 2=STACK, 3=UNKNOWN)")?;

        registry.register(Box::new(decisions_total.clone()))?;
        registry.register(Box::new(bytes_freed_total.clone()))?;
        registry.register(Box::new(capacity_used_percent.clone()))?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;
        registry.register(Box::new(last_run_timestamp.clone()))?;
        registry.register(Box::new(current_mode.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            decisions_total,
            bytes_freed_total,
            capacity_used_percent,
            cycle_duration_seconds,
            last_run_timestamp,
            current_mode,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_delete(&self, bytes: u64) {
        self.decisions_total.with_label_values(&["DELETE", "UNKNOWN"]).inc();
        self.bytes_freed_total.inc_by(bytes as f64);
    }

    pub fn record_dry_run(&self) {
        self.decisions_total.with_label_values(&["DRY_RUN", "UNKNOWN"]).inc();
    }

    pub fn record_skip(&self) {
        self.decisions_total.with_label_values(&["SKIP", "UNKNOWN"]).inc();
    }

    pub fn record_error(&self) {
        self.decisions_total.with_label_values(&["ERROR", "UNKNOWN"]).inc();
    }

    pub fn set_capacity(&self, path: &str, used_percent: f64) {
        self.capacity_used_percent.with_label_values(&[path]).set(used_percent);
    }

    pub fn observe_cycle_duration(&self, seconds: f64) {
        self.cycle_duration_seconds.observe(seconds);
        self.last_run_timestamp.set(chrono::Utc::now().timestamp() as f64);
    }

    pub fn set_current_mode(&self, mode: sweeper_core::model::Mode) {
        let value = match mode {
            sweeper_core::model::Mode::Age => 0.0,
            sweeper_core::model::Mode::Disk => 1.0,
            sweeper_core::model::Mode::Stack => 2.0,
            sweeper_core::model::Mode::Unknown => 3.0,
        };
        self.current_mode.set(value);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("failed to construct metrics registry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_creation_registers_all_collectors() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn record_delete_increments_decisions_and_bytes() {
        let metrics = Metrics::new().unwrap();
        metrics.record_delete(1024);

        let gathered = metrics.registry().gather();
        let decisions = gathered.iter().find(|m| m.get_name() == "sweeper_decisions_total").unwrap();
        assert_eq!(decisions.get_metric()[0].get_counter().get_value(), 1.0);

        let bytes = gathered.iter().find(|m| m.get_name() == "sweeper_bytes_freed_total").unwrap();
        assert_eq!(bytes.get_metric()[0].get_counter().get_value(), 1024.0);
    }

    #[test]
    fn set_capacity_tracks_per_path_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_capacity("/data/logs", 92.5);

        let gathered = metrics.registry().gather();
        let gauge = gathered.iter().find(|m| m.get_name() == "sweeper_capacity_used_percent").unwrap();
        assert_eq!(gauge.get_metric()[0].get_gauge().get_value(), 92.5);
    }

    #[test]
    fn set_current_mode_maps_enum_to_expected_value() {
        let metrics = Metrics::new().unwrap();
        metrics.set_current_mode(sweeper_core::model::Mode::Stack);

        let gathered = metrics.registry().gather();
        let gauge = gathered.iter().find(|m| m.get_name() == "sweeper_current_mode").unwrap();
        assert_eq!(gauge.get_metric()[0].get_gauge().get_value(), 2.0);
    }
}

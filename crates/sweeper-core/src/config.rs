//! `PathRule` / `GlobalConfig`: the user-facing policy schema (spec.md §3).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_interval_minutes() -> u32 {
    15
}
fn default_stack_threshold() -> f64 {
    98.0
}
fn default_stack_age_days() -> u32 {
    14
}
fn default_max_free_percent() -> f64 {
    90.0
}
fn default_target_free_percent() -> f64 {
    80.0
}
fn default_priority() -> i32 {
    100
}
fn default_nfs_timeout_seconds() -> u64 {
    5
}
fn default_audit_retention_days() -> u32 {
    90
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "plain".to_string()
}
fn default_health_bind_addr() -> String {
    "127.0.0.1:9090".to_string()
}
fn default_database_path() -> PathBuf {
    PathBuf::from("/var/lib/storage-sage/audit.db")
}

/// Policy bundle governing one monitored directory tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRule {
    pub path: PathBuf,

    /// Files with mtime older than this many days are AGE-eligible. 0 disables
    /// age-based selection for this rule.
    #[serde(default)]
    pub age_off_days: u32,

    /// Percent used at which this rule becomes DISK-eligible.
    #[serde(default = "default_max_free_percent")]
    pub max_free_percent: f64,

    /// Advisory cleanup target; the cleaner does not currently short-circuit
    /// on reaching it (see DESIGN.md open-question decision #2).
    #[serde(default = "default_target_free_percent")]
    pub target_free_percent: f64,

    /// Percent used at which, combined with `stack_age_days`, this rule enters
    /// STACK mode.
    #[serde(default = "default_stack_threshold")]
    pub stack_threshold: f64,

    /// Age gate for STACK mode.
    #[serde(default = "default_stack_age_days")]
    pub stack_age_days: u32,

    /// Lower sorts first when rules are ordered before a scan.
    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Legacy path-specific override of the global `min_free_percent`. Applies
    /// only when present; the global default is used otherwise (DESIGN.md
    /// open-question decision #3).
    #[serde(default)]
    pub min_free_percent: Option<f64>,
}

impl PathRule {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            age_off_days: 0,
            max_free_percent: default_max_free_percent(),
            target_free_percent: default_target_free_percent(),
            stack_threshold: default_stack_threshold(),
            stack_age_days: default_stack_age_days(),
            priority: default_priority(),
            min_free_percent: None,
        }
    }

    /// The effective minimum-free-percent for this rule: its own override if
    /// present, else the supplied global default.
    pub fn effective_min_free_percent(&self, global_default: f64) -> f64 {
        self.min_free_percent.unwrap_or(global_default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupOptions {
    #[serde(default)]
    pub recursive: bool,
    #[serde(default = "default_true")]
    pub delete_dirs: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            delete_dirs: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Advisory CPU ceiling. Parsed and carried through config round-trips;
    /// not currently consumed by the Scanner or Cleaner (DESIGN.md open
    /// question #7).
    #[serde(default)]
    pub max_cpu_percent: Option<f64>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_cpu_percent: None,
        }
    }
}

/// Top-level configuration loaded from the daemon's config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Paths handled with default-derived rules (no explicit `paths` entry).
    #[serde(default)]
    pub scan_paths: Vec<PathBuf>,

    /// Explicit per-path policies. A path named here wins over an identical
    /// entry in `scan_paths` (spec.md §3 invariant).
    #[serde(default)]
    pub paths: Vec<PathRule>,

    #[serde(default)]
    pub age_off_days: u32,

    #[serde(default = "default_max_free_percent")]
    pub min_free_percent: f64,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    #[serde(default = "default_nfs_timeout_seconds")]
    pub nfs_timeout_seconds: u64,

    #[serde(default)]
    pub cleanup_options: CleanupOptions,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default)]
    pub resource_limits: ResourceLimits,

    #[serde(default = "default_audit_retention_days")]
    pub audit_retention_days: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Additional paths the validator treats as protected, beyond its
    /// built-in base set (spec.md §4.2).
    #[serde(default)]
    pub extra_protected_paths: Vec<PathBuf>,

    /// Bind address for the `/healthz`, `/readyz`, `/metrics` router.
    #[serde(default = "default_health_bind_addr")]
    pub health_bind_addr: String,
}

impl GlobalConfig {
    /// Merges `scan_paths` and `paths` into one rule-per-path list, dropping
    /// any `scan_paths` entry shadowed by a specific `paths` rule, and
    /// applying global age/free-percent defaults to the derived rules.
    pub fn effective_rules(&self) -> Vec<PathRule> {
        let mut rules: Vec<PathRule> = self.paths.clone();
        let explicit: std::collections::HashSet<&PathBuf> =
            rules.iter().map(|r| &r.path).collect();

        for path in &self.scan_paths {
            if explicit.contains(path) {
                continue;
            }
            let mut rule = PathRule::new(path.clone());
            rule.age_off_days = self.age_off_days;
            rule.max_free_percent = self.min_free_percent;
            rules.push(rule);
        }

        rules.sort_by_key(|r| r.priority);
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_paths_get_global_defaults() {
        let cfg = GlobalConfig {
            scan_paths: vec![PathBuf::from("/data/logs")],
            paths: vec![],
            age_off_days: 7,
            min_free_percent: 90.0,
            interval_minutes: 15,
            nfs_timeout_seconds: 5,
            cleanup_options: CleanupOptions::default(),
            database_path: PathBuf::from("/var/lib/storage-sage/audit.db"),
            resource_limits: ResourceLimits::default(),
            audit_retention_days: 90,
            log_level: "info".into(),
            log_format: "plain".into(),
            extra_protected_paths: vec![],
            health_bind_addr: default_health_bind_addr(),
        };
        let rules = cfg.effective_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].age_off_days, 7);
        assert_eq!(rules[0].max_free_percent, 90.0);
    }

    #[test]
    fn explicit_path_rule_wins_over_scan_paths_entry() {
        let mut explicit_rule = PathRule::new(PathBuf::from("/data/logs"));
        explicit_rule.age_off_days = 3;
        let cfg = GlobalConfig {
            scan_paths: vec![PathBuf::from("/data/logs")],
            paths: vec![explicit_rule],
            age_off_days: 30,
            min_free_percent: 90.0,
            interval_minutes: 15,
            nfs_timeout_seconds: 5,
            cleanup_options: CleanupOptions::default(),
            database_path: PathBuf::from("/var/lib/storage-sage/audit.db"),
            resource_limits: ResourceLimits::default(),
            audit_retention_days: 90,
            log_level: "info".into(),
            log_format: "plain".into(),
            extra_protected_paths: vec![],
            health_bind_addr: default_health_bind_addr(),
        };
        let rules = cfg.effective_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].age_off_days, 3);
    }

    #[test]
    fn effective_min_free_percent_falls_back_to_global() {
        let rule = PathRule::new(PathBuf::from("/data"));
        assert_eq!(rule.effective_min_free_percent(85.0), 85.0);

        let mut overridden = PathRule::new(PathBuf::from("/data"));
        overridden.min_free_percent = Some(70.0);
        assert_eq!(overridden.effective_min_free_percent(85.0), 70.0);
    }
}

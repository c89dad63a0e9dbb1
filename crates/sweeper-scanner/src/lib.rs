//! Scanner (spec.md §4.3): walks each configured rule's tree, classifies
//! entries against the rule's thresholds, and attaches a structured deletion
//! reason.
//!
//! Grounded on this codebase's session-cleanup module's three-pass
//! (age / compress / size) structure, generalized here into three
//! independent reason predicates evaluated per entry.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use sweeper_core::model::{AgeThreshold, DiskThreshold, StackedCleanup};
use sweeper_core::time::age_days;
use sweeper_core::{Candidate, DeletionReason, PathRule};
use sweeper_probe::{DiskProbe, DiskUsage};

pub struct Scanner {
    probe: DiskProbe,
}

impl Scanner {
    pub fn new(probe: DiskProbe) -> Self {
        Self { probe }
    }

    /// Scans every rule (already sorted by priority) and returns all
    /// candidates sorted globally by `mtime` ascending, so the Cleaner frees
    /// the stalest bytes first.
    pub async fn scan_all(&self, rules: &[PathRule], now: DateTime<Utc>, nfs_timeout: Duration) -> Vec<Candidate> {
        let mut all = Vec::new();
        for rule in rules {
            all.extend(self.scan_rule(rule, now, nfs_timeout).await);
        }
        all.sort_by_key(|c| c.mtime);
        all
    }

    /// Scans a single rule's tree. Returns an empty vec (not an error) if the
    /// rule root is stale, unreadable, or no eligibility condition holds.
    pub async fn scan_rule(&self, rule: &PathRule, now: DateTime<Utc>, nfs_timeout: Duration) -> Vec<Candidate> {
        if self.probe.is_stale(&rule.path, nfs_timeout).await {
            tracing::warn!(path = %rule.path.display(), "skipping stale rule root");
            return Vec::new();
        }

        let usage = match self.probe.usage(&rule.path) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(path = %rule.path.display(), error = %e, "disk probe failed, skipping rule");
                return Vec::new();
            }
        };

        let need_age = rule.age_off_days > 0;
        let need_disk = usage.used_percent >= rule.max_free_percent;
        let need_stack = usage.used_percent >= rule.stack_threshold;

        if !need_age && !need_disk && !need_stack {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        walk(&rule.path, rule, &usage, need_age, need_disk, need_stack, now, &mut candidates);

        for candidate in &mut candidates {
            if candidate.is_dir {
                candidate.is_empty_dir = std::fs::read_dir(&candidate.path)
                    .map(|mut entries| entries.next().is_none())
                    .unwrap_or(false);
            }
        }

        candidates
    }
}

#[allow(clippy::too_many_arguments)]
fn walk(
    dir: &Path,
    rule: &PathRule,
    usage: &DiskUsage,
    need_age: bool,
    need_disk: bool,
    need_stack: bool,
    now: DateTime<Utc>,
    candidates: &mut Vec<Candidate>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "permission error walking directory, skipping subtree");
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "permission error reading entry, continuing walk");
                continue;
            }
        };

        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "stat error, skipping entry");
                continue;
            }
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "stat error, skipping entry");
                continue;
            }
        };

        let path = entry.path();
        let is_dir = file_type.is_dir();
        let mtime: DateTime<Utc> = metadata.modified().map(DateTime::<Utc>::from).unwrap_or(now);
        let size = metadata.len();
        let age = age_days(now, mtime);

        let mut reason = DeletionReason {
            age_threshold: None,
            disk_threshold: None,
            stacked_cleanup: None,
            path_rule: rule.path.display().to_string(),
            evaluated_at: now,
        };

        if need_age && rule.age_off_days > 0 && age >= rule.age_off_days {
            reason.age_threshold = Some(AgeThreshold { configured_days: rule.age_off_days, actual_age_days: age });
        }
        if need_disk {
            reason.disk_threshold = Some(DiskThreshold { configured_percent: rule.max_free_percent, actual_percent: usage.used_percent });
        }
        if need_stack && age >= rule.stack_age_days {
            reason.stacked_cleanup = Some(StackedCleanup {
                stack_threshold: rule.stack_threshold,
                stack_age_days: rule.stack_age_days,
                actual_percent: usage.used_percent,
                actual_age_days: age,
            });
        }

        if reason.has_any_reason() {
            candidates.push(Candidate {
                path: path.clone(),
                size,
                mtime,
                is_dir,
                is_empty_dir: false,
                reason,
            });
        }

        if is_dir && !file_type.is_symlink() {
            walk(&path, rule, usage, need_age, need_disk, need_stack, now, candidates);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn age_file(path: &Path, days_ago: i64) {
        let mtime = SystemTime::now() - std::time::Duration::from_secs((days_ago * 86_400) as u64);
        set_file_mtime(path, FileTime::from_system_time(mtime)).unwrap();
    }

    fn base_rule(path: &Path) -> PathRule {
        let mut rule = PathRule::new(path.to_path_buf());
        rule.age_off_days = 7;
        rule.max_free_percent = 90.0;
        rule.stack_threshold = 98.0;
        rule.stack_age_days = 14;
        rule
    }

    fn fake_usage(used_percent: f64) -> DiskUsage {
        DiskUsage { used_percent, free_bytes: 1, total_bytes: 100 }
    }

    // The walk/predicate logic is exercised directly (bypassing the real
    // DiskProbe) since scenarios S1-S4 specify an exact probe reading that
    // has nothing to do with the tempdir's real filesystem usage.
    fn scan_with_usage(rule: &PathRule, usage: DiskUsage, now: DateTime<Utc>) -> Vec<Candidate> {
        let need_age = rule.age_off_days > 0;
        let need_disk = usage.used_percent >= rule.max_free_percent;
        let need_stack = usage.used_percent >= rule.stack_threshold;
        let mut candidates = Vec::new();
        if need_age || need_disk || need_stack {
            walk(&rule.path, rule, &usage, need_age, need_disk, need_stack, now, &mut candidates);
        }
        candidates
    }

    #[test]
    fn s1_age_only() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.log");
        let b = tmp.path().join("b.log");
        std::fs::write(&a, vec![0u8; 1024]).unwrap();
        std::fs::write(&b, vec![0u8; 2048]).unwrap();
        age_file(&a, 10);
        age_file(&b, 1);

        let rule = base_rule(tmp.path());
        let now = Utc::now();
        let candidates = scan_with_usage(&rule, fake_usage(50.0), now);

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.path, a);
        assert!(c.reason.age_threshold.is_some());
        assert!(c.reason.disk_threshold.is_none());
        assert!(c.reason.stacked_cleanup.is_none());
        assert_eq!(c.reason.age_threshold.unwrap().configured_days, 7);
    }

    #[test]
    fn s2_disk_only() {
        let tmp = TempDir::new().unwrap();
        let b = tmp.path().join("b.log");
        std::fs::write(&b, vec![0u8; 2048]).unwrap();
        age_file(&b, 3);

        let rule = base_rule(tmp.path());
        let now = Utc::now();
        let candidates = scan_with_usage(&rule, fake_usage(95.0), now);

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert!(c.reason.age_threshold.is_none());
        assert!(c.reason.disk_threshold.is_some());
        assert!(c.reason.stacked_cleanup.is_none());
        use sweeper_core::model::PrimaryReason;
        assert_eq!(c.reason.primary_reason(), PrimaryReason::DiskThreshold);
    }

    #[test]
    fn s3_combined() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.log");
        std::fs::write(&a, vec![0u8; 1024]).unwrap();
        age_file(&a, 10);

        let rule = base_rule(tmp.path());
        let now = Utc::now();
        let candidates = scan_with_usage(&rule, fake_usage(95.0), now);

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert!(c.reason.age_threshold.is_some());
        assert!(c.reason.disk_threshold.is_some());
        assert!(c.reason.stacked_cleanup.is_none());
        use sweeper_core::model::PrimaryReason;
        assert_eq!(c.reason.primary_reason(), PrimaryReason::Combined);
        assert_eq!(c.reason.mode().to_string(), "DISK");
    }

    #[test]
    fn s4_stacked() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.log");
        std::fs::write(&a, vec![0u8; 1024]).unwrap();
        age_file(&a, 20);

        let rule = base_rule(tmp.path());
        let now = Utc::now();
        let candidates = scan_with_usage(&rule, fake_usage(99.0), now);

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert!(c.reason.age_threshold.is_some());
        assert!(c.reason.disk_threshold.is_some());
        assert!(c.reason.stacked_cleanup.is_some());
        use sweeper_core::model::PrimaryReason;
        assert_eq!(c.reason.primary_reason(), PrimaryReason::StackedCleanup);
        assert_eq!(c.reason.mode().to_string(), "STACK");
    }

    #[test]
    fn no_eligibility_condition_skips_the_walk_entirely() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.log");
        std::fs::write(&a, vec![0u8; 1024]).unwrap();
        age_file(&a, 100);

        let mut rule = base_rule(tmp.path());
        rule.age_off_days = 0; // disables age policy

        let candidates = scan_with_usage(&rule, fake_usage(10.0), Utc::now());
        assert!(candidates.is_empty());
    }

    #[test]
    fn rule_root_itself_is_never_a_candidate() {
        let tmp = TempDir::new().unwrap();
        age_file(tmp.path(), 100);
        let rule = base_rule(tmp.path());
        let candidates = scan_with_usage(&rule, fake_usage(10.0), Utc::now());
        assert!(candidates.iter().all(|c| c.path != rule.path));
    }

    #[tokio::test]
    async fn global_candidates_are_sorted_oldest_first() {
        let tmp = TempDir::new().unwrap();
        let newer = tmp.path().join("newer.log");
        let older = tmp.path().join("older.log");
        std::fs::write(&newer, b"x").unwrap();
        std::fs::write(&older, b"x").unwrap();
        age_file(&newer, 8);
        age_file(&older, 30);

        let scanner = Scanner::new(DiskProbe::new());
        let rule = base_rule(tmp.path());
        let candidates = scanner.scan_all(&[rule], Utc::now(), Duration::from_secs(5)).await;

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].path, older);
        assert_eq!(candidates[1].path, newer);
    }
}

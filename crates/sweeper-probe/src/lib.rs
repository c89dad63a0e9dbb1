//! Disk Probe (spec.md §4.1): per-path filesystem capacity and stale-mount
//! detection.
//!
//! Usage is read via `statvfs` (the `nix` crate), the same call this
//! codebase's disk-guardian and page-server-style eviction tasks use to
//! cross-check real filesystem state rather than trusting cached accounting.
//! Stale-mount detection runs the metadata probe on a blocking task so a
//! wedged NFS mount cannot stall the async scheduler loop.

use nix::sys::statvfs::statvfs;
use std::path::Path;
use std::time::Duration;
use sweeper_core::{Error, Result};

/// Filesystem capacity for the mount containing a probed path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskUsage {
    pub used_percent: f64,
    pub free_bytes: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiskProbe;

impl DiskProbe {
    pub fn new() -> Self {
        Self
    }

    /// `{used_percent, free_bytes, total_bytes}` for the mount containing
    /// `path`. Fails with a `Filesystem` error if the `statvfs` call fails.
    pub fn usage(&self, path: &Path) -> Result<DiskUsage> {
        let stat = statvfs(path).map_err(|errno| Error::Filesystem {
            path: path.display().to_string(),
            source: std::io::Error::from_raw_os_error(errno as i32),
        })?;

        let fragment_size = stat.fragment_size().max(1);
        let total_bytes = stat.blocks() * fragment_size;
        let free_bytes = stat.blocks_available() * fragment_size;

        let used_percent = if total_bytes > 0 {
            100.0 * (1.0 - (free_bytes as f64 / total_bytes as f64))
        } else {
            0.0
        };

        Ok(DiskUsage { used_percent, free_bytes, total_bytes })
    }

    /// Runs a metadata probe against `path` on a blocking task and returns
    /// `true` if it either exceeds `timeout` or fails with a stale-handle /
    /// I/O error class (`ESTALE`, `EIO`, `ENXIO`). Never blocks the caller
    /// beyond `timeout`.
    pub async fn is_stale(&self, path: &Path, timeout: Duration) -> bool {
        let path = path.to_path_buf();
        let probe = tokio::task::spawn_blocking(move || std::fs::metadata(&path));

        match tokio::time::timeout(timeout, probe).await {
            Ok(Ok(Ok(_metadata))) => false,
            Ok(Ok(Err(e))) => is_stale_io_error(&e),
            Ok(Err(_join_error)) => true,
            Err(_elapsed) => true,
        }
    }
}

fn is_stale_io_error(err: &std::io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(code) if code == nix::errno::Errno::ESTALE as i32
            || code == nix::errno::Errno::EIO as i32
            || code == nix::errno::Errno::ENXIO as i32
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn usage_reports_sane_values_for_a_real_mount() {
        let tmp = TempDir::new().unwrap();
        let probe = DiskProbe::new();
        let usage = probe.usage(tmp.path()).unwrap();
        assert!(usage.total_bytes > 0);
        assert!(usage.used_percent >= 0.0 && usage.used_percent <= 100.0);
    }

    #[tokio::test]
    async fn is_stale_false_for_a_healthy_existing_path() {
        let tmp = TempDir::new().unwrap();
        let probe = DiskProbe::new();
        assert!(!probe.is_stale(tmp.path(), Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn is_stale_false_for_plain_not_found() {
        // NotFound is not one of the stale-handle error classes.
        let probe = DiskProbe::new();
        let missing = Path::new("/nonexistent/does-not-exist-really");
        assert!(!probe.is_stale(missing, Duration::from_secs(1)).await);
    }
}

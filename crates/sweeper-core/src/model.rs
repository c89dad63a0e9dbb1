//! `Candidate`, `DeletionReason`, `AuditRecord`: the data that flows between
//! the Scanner, Cleaner, and Audit Store (spec.md §3).
//!
//! `DeletionReason` is a sum-of-optional-subrecords, deliberately not an
//! inheritance hierarchy (spec.md §9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeThreshold {
    pub configured_days: u32,
    pub actual_age_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskThreshold {
    pub configured_percent: f64,
    pub actual_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackedCleanup {
    pub stack_threshold: f64,
    pub stack_age_days: u32,
    pub actual_percent: f64,
    pub actual_age_days: u32,
}

/// Why a candidate was selected. Multiple sub-reasons may coexist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionReason {
    pub age_threshold: Option<AgeThreshold>,
    pub disk_threshold: Option<DiskThreshold>,
    pub stacked_cleanup: Option<StackedCleanup>,
    pub path_rule: String,
    pub evaluated_at: DateTime<Utc>,
}

/// The primary reason derived from a `DeletionReason`'s populated sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryReason {
    StackedCleanup,
    Combined,
    DiskThreshold,
    AgeThreshold,
    Unknown,
}

impl DeletionReason {
    pub fn has_any_reason(&self) -> bool {
        self.age_threshold.is_some() || self.disk_threshold.is_some() || self.stacked_cleanup.is_some()
    }

    /// stacked if present; else combined if both disk and age; else whichever
    /// single is present; else unknown.
    pub fn primary_reason(&self) -> PrimaryReason {
        if self.stacked_cleanup.is_some() {
            PrimaryReason::StackedCleanup
        } else if self.disk_threshold.is_some() && self.age_threshold.is_some() {
            PrimaryReason::Combined
        } else if self.disk_threshold.is_some() {
            PrimaryReason::DiskThreshold
        } else if self.age_threshold.is_some() {
            PrimaryReason::AgeThreshold
        } else {
            PrimaryReason::Unknown
        }
    }

    pub fn mode(&self) -> Mode {
        match self.primary_reason() {
            PrimaryReason::StackedCleanup => Mode::Stack,
            PrimaryReason::DiskThreshold | PrimaryReason::Combined => Mode::Disk,
            PrimaryReason::AgeThreshold => Mode::Age,
            PrimaryReason::Unknown => Mode::Unknown,
        }
    }
}

/// The cycle's advisory operating mode (spec.md §4.6), or the mode a record
/// was filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Age,
    Disk,
    Stack,
    Unknown,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Age => "AGE",
            Mode::Disk => "DISK",
            Mode::Stack => "STACK",
            Mode::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    File,
    Directory,
    EmptyDirectory,
}

/// One filesystem entry the Scanner has selected for the Cleaner's
/// consideration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub is_dir: bool,
    /// Only meaningful when `is_dir`; set after a post-walk `readdir`.
    pub is_empty_dir: bool,
    pub reason: DeletionReason,
}

impl Candidate {
    pub fn object_type(&self) -> ObjectType {
        if !self.is_dir {
            ObjectType::File
        } else if self.is_empty_dir {
            ObjectType::EmptyDirectory
        } else {
            ObjectType::Directory
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Delete,
    DryRun,
    Skip,
    Error,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Delete => "DELETE",
            Action::DryRun => "DRY_RUN",
            Action::Skip => "SKIP",
            Action::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One row per Cleaner decision, as persisted by the Audit Store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub path: PathBuf,
    pub file_name: String,
    pub object_type: ObjectType,
    pub size: u64,
    pub age_threshold: Option<AgeThreshold>,
    pub disk_threshold: Option<DiskThreshold>,
    pub stacked_cleanup: Option<StackedCleanup>,
    pub primary_reason: PrimaryReason,
    pub mode: Mode,
    pub path_rule: String,
    pub error_message: Option<String>,
}

impl AuditRecord {
    /// Builds a record from a `Candidate` and the outcome of attempting it.
    /// `id`/`timestamp` are assigned by the Audit Store on append.
    pub fn from_candidate(candidate: &Candidate, action: Action, error_message: Option<String>) -> Self {
        let reason = &candidate.reason;
        Self {
            id: 0,
            timestamp: Utc::now(),
            action,
            path: candidate.path.clone(),
            file_name: candidate
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            object_type: candidate.object_type(),
            size: candidate.size,
            age_threshold: reason.age_threshold,
            disk_threshold: reason.disk_threshold,
            stacked_cleanup: reason.stacked_cleanup,
            primary_reason: reason.primary_reason(),
            mode: reason.mode(),
            path_rule: reason.path_rule.clone(),
            error_message,
        }
    }
}

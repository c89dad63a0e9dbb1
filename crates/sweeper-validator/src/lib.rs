//! Safety Validator (spec.md §4.2): the single authority deciding whether a
//! raw path may be deleted.
//!
//! Grounded on the byte-level, traversal-safe directory-name validation in
//! this codebase's session cleanup module (`is_valid_date_directory`), and on
//! `remove_dir_all`'s documented reasoning about symlink-escape races:
//! directory-traversal attacks are rejected lexically first, then a real
//! symlink resolution closes the race a purely lexical check would miss.

use std::path::{Component, Path, PathBuf};
use sweeper_core::{Error, Result};

const BASE_PROTECTED: &[&str] = &["/", "/etc", "/bin", "/usr", "/boot", "/lib", "/lib64", "/sbin"];

/// Constructed once at startup with the configured allowed roots and any
/// extra protected paths (e.g. the daemon's own state directory). Immutable
/// after construction.
#[derive(Debug, Clone)]
pub struct SafetyValidator {
    allowed_roots: Vec<PathBuf>,
    protected: Vec<PathBuf>,
}

impl SafetyValidator {
    pub fn new(allowed_roots: Vec<PathBuf>, extra_protected: Vec<PathBuf>) -> Self {
        let allowed_roots = allowed_roots.iter().map(|p| clean_absolute(p)).collect::<Option<Vec<_>>>().unwrap_or_default();

        let mut protected: Vec<PathBuf> = BASE_PROTECTED.iter().map(PathBuf::from).collect();
        protected.extend(extra_protected.iter().filter_map(|p| clean_absolute(p)));

        Self { allowed_roots, protected }
    }

    /// The single gate. Returns `Ok(cleaned_path)` if the path may be
    /// deleted, or a typed error naming which safety rule rejected it.
    ///
    /// Checks run in strict order (spec.md §4.2): `InvalidPath` →
    /// `ProtectedPath` → `OutsideAllowed` → `Traversal` → `SymlinkEscape`.
    pub fn validate(&self, raw_path: &str) -> Result<PathBuf> {
        let trimmed = raw_path.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidPath(raw_path.to_string()));
        }

        let cleaned = clean_absolute(Path::new(trimmed))
            .ok_or_else(|| Error::InvalidPath(raw_path.to_string()))?;

        if self.protected.iter().any(|p| is_same_or_descendant(&cleaned, p)) {
            return Err(Error::ProtectedPath(cleaned.display().to_string()));
        }

        if !self.allowed_roots.iter().any(|root| is_same_or_descendant(&cleaned, root)) {
            return Err(Error::OutsideAllowed(cleaned.display().to_string()));
        }

        if has_dotdot_segment(trimmed) {
            return Err(Error::Traversal(raw_path.to_string()));
        }

        match std::fs::canonicalize(&cleaned) {
            Ok(resolved) => {
                if !self.allowed_roots.iter().any(|root| is_same_or_descendant(&resolved, root)) {
                    return Err(Error::SymlinkEscape(resolved.display().to_string()));
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Target does not exist; the later delete attempt will
                // naturally fail. Not a safety violation.
            }
            Err(_) => {
                // Cannot resolve for some other transient reason (e.g.
                // permission denied on an intermediate component). Defer to
                // the delete attempt rather than block here.
            }
        }

        Ok(cleaned)
    }
}

/// True if `path` equals `root` or is a descendant of it, matched on path
/// segment boundaries — `/tmp/allowed` must not match `/tmp/allowedother`.
fn is_same_or_descendant(path: &Path, root: &Path) -> bool {
    let mut path_components = path.components();
    for root_component in root.components() {
        match path_components.next() {
            Some(p) if p == root_component => continue,
            _ => return false,
        }
    }
    true
}

/// True if `raw` (before any cleaning) contains a literal `..` path segment.
/// Guards against callers that pre-resolve `..` before sending (spec.md
/// §4.2 step 4).
fn has_dotdot_segment(raw: &str) -> bool {
    Path::new(raw)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

/// Lexically normalizes `path` to an absolute, cleaned form: joins it to the
/// current working directory if relative, then collapses `.` and `..`
/// components without touching the filesystem. Returns `None` only if the
/// current directory cannot be determined for a relative input.
fn clean_absolute(path: &Path) -> Option<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

//! The delete capability the Cleaner is built against.
//!
//! Abstracting `remove`/`remove_recursive` behind a trait is what makes the
//! dry-run contract (spec.md §4.4, §9) testable: a test substitutes a
//! recording implementation and asserts zero invocations, rather than racing
//! the real filesystem.

use std::path::Path;

pub trait Remover: Send + Sync {
    fn remove_file(&self, path: &Path) -> std::io::Result<()>;
    fn remove_empty_dir(&self, path: &Path) -> std::io::Result<()>;
    fn remove_recursive(&self, path: &Path) -> std::io::Result<()>;
}

/// The production implementation: real syscalls via `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRemover;

impl<T: Remover + ?Sized> Remover for std::sync::Arc<T> {
    fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        (**self).remove_file(path)
    }

    fn remove_empty_dir(&self, path: &Path) -> std::io::Result<()> {
        (**self).remove_empty_dir(path)
    }

    fn remove_recursive(&self, path: &Path) -> std::io::Result<()> {
        (**self).remove_recursive(path)
    }
}

impl Remover for OsRemover {
    fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_empty_dir(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_dir(path)
    }

    fn remove_recursive(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_dir_all(path)
    }
}

#[cfg(test)]
pub mod test_support {
    use super::Remover;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Records every call it receives and performs no filesystem mutation.
    /// Used to prove the Cleaner's dry-run contract: zero calls regardless
    /// of candidate count.
    #[derive(Debug, Default)]
    pub struct RecordingRemover {
        calls: Mutex<Vec<PathBuf>>,
    }

    impl RecordingRemover {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Remover for RecordingRemover {
        fn remove_file(&self, path: &Path) -> std::io::Result<()> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn remove_empty_dir(&self, path: &Path) -> std::io::Result<()> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn remove_recursive(&self, path: &Path) -> std::io::Result<()> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }
}

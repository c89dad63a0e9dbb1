//! Error types for the cleanup daemon core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("protected path: {0}")]
    ProtectedPath(String),

    #[error("path outside allowed roots: {0}")]
    OutsideAllowed(String),

    #[error("path traversal attempt: {0}")]
    Traversal(String),

    #[error("symlink escapes allowed roots: {0}")]
    SymlinkEscape(String),

    #[error("filesystem error for {path}: {source}")]
    Filesystem {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stale mount at {0}")]
    StaleMount(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration not found at {0}")]
    ConfigNotFound(String),

    #[error("audit store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Source error types.

use std::path::PathBuf;
use thiserror::Error;

/// File source operation errors.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out acquiring shared lock on {} after {waited_ms} ms", .path.display())]
    LockTimeout { path: PathBuf, waited_ms: u64 },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

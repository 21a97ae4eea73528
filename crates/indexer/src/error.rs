//! Indexing error types.

use rlookup_core::hash::ChecksumKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the subdirectory indexing and publish engines.
///
/// Per-package variants (`ArchiveCorrupt`, `ChecksumMismatch`,
/// `MetadataIncomplete`, `MissingChecksum`) are captured and counted by the
/// engines; the remaining variants abort the enclosing subdirectory run.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("could not create workdir {}: {source}", .path.display())]
    Workdir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("source error: {0}")]
    Source(#[from] rlookup_source::SourceError),

    #[error("could not read state file {}: {detail}", .path.display())]
    State { path: PathBuf, detail: String },

    #[error("could not parse manifest: {0}")]
    ManifestParse(String),

    #[error("package record carries neither sha256 nor md5")]
    MissingChecksum,

    #[error("corrupt archive: {0}")]
    ArchiveCorrupt(String),

    #[error("checksum mismatch ({kind}): actual {actual} vs expected {expected}")]
    ChecksumMismatch {
        kind: ChecksumKind,
        expected: String,
        actual: String,
    },

    #[error("could not parse either info/files or info/paths.json")]
    MetadataIncomplete,

    #[error("could not commit {}: {source}", .path.display())]
    Commit {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("bus send failed: {0}")]
    Bus(#[from] rlookup_bus::BusError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Task(String),
}

/// Result type for indexing operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

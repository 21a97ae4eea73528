//! File source trait definitions.

use crate::error::SourceResult;
use async_trait::async_trait;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use tempfile::TempPath;

/// An open file handle returned by a source.
///
/// Reads are synchronous so the handle can be moved into blocking sections
/// (archive extraction, streaming JSON decode). Dropping the handle closes
/// it; snapshot handles additionally delete their backing temp file.
#[derive(Debug)]
pub struct SourceFile {
    file: File,
    _snapshot: Option<TempPath>,
}

impl SourceFile {
    /// Wrap a directly opened file.
    pub fn direct(file: File) -> Self {
        Self {
            file,
            _snapshot: None,
        }
    }

    /// Wrap a snapshot copy; `path` is deleted when the handle is dropped.
    pub fn snapshot(file: File, path: TempPath) -> Self {
        Self {
            file,
            _snapshot: Some(path),
        }
    }
}

impl Read for SourceFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Read access to the files of one conda server tree.
#[async_trait]
pub trait ChannelFileSource: Send + Sync + 'static {
    /// Open a file by its path relative to the server root, e.g.
    /// `base/linux-64/repodata.json`.
    ///
    /// Paths whose basename is `repodata.json` must be returned as a
    /// snapshot: the manifest may be rewritten by an external publisher at
    /// any instant, and a streaming decoder must never observe a
    /// half-rewritten file. Package archives are immutable once named and
    /// are opened directly.
    async fn open(&self, relative_path: &str) -> SourceResult<SourceFile>;
}

impl fmt::Debug for dyn ChannelFileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn ChannelFileSource")
    }
}

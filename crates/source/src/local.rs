//! Local filesystem channel source.

use crate::error::{SourceError, SourceResult};
use crate::traits::{ChannelFileSource, SourceFile};
use async_trait::async_trait;
use fs2::FileExt;
use rlookup_core::REPODATA_FILENAME;
use rlookup_core::config::ServerConfig;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on the advisory-lock polling granularity. Configured retry
/// intervals above this are polled more often so the deadline stays accurate.
const MAX_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(750);

/// Channel file source backed by a local directory tree.
#[derive(Clone, Debug)]
pub struct LocalFileSource {
    source_dir: PathBuf,
    temp_dir: PathBuf,
    lock_filename: String,
    lock_max_wait: Duration,
    lock_retry_interval: Duration,
}

impl LocalFileSource {
    /// Create a new local source rooted at `source_dir`.
    ///
    /// Manifest snapshots are copied into `temp_dir`. An empty
    /// `lock_filename` disables manifest locking.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
        lock_filename: impl Into<String>,
        lock_max_wait: Duration,
        lock_retry_interval: Duration,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            temp_dir: temp_dir.into(),
            lock_filename: lock_filename.into(),
            lock_max_wait,
            lock_retry_interval,
        }
    }

    /// Build a local source from server configuration, snapshotting into the
    /// system temp directory.
    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self::new(
            &config.path,
            std::env::temp_dir(),
            &config.repodata_lock_filename,
            config.lock_max_wait(),
            config.lock_retry_interval(),
        )
    }

    fn open_sync(&self, relative_path: &str) -> SourceResult<SourceFile> {
        let path = self.source_dir.join(relative_path);
        let basename = Path::new(relative_path).file_name().and_then(|n| n.to_str());

        if basename == Some(REPODATA_FILENAME) {
            return self.snapshot_manifest(relative_path, &path);
        }

        let file = File::open(&path).map_err(|e| not_found_or_io(e, relative_path))?;
        Ok(SourceFile::direct(file))
    }

    /// Copy the manifest into a fresh temp file while holding a shared
    /// advisory lock, then hand back a handle over the copy. The lock is
    /// released as soon as the copy completes; the temp file is deleted when
    /// the handle is dropped.
    fn snapshot_manifest(&self, relative_path: &str, path: &Path) -> SourceResult<SourceFile> {
        let _lock = if self.lock_filename.is_empty() {
            None
        } else {
            let lock_path = path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&self.lock_filename);
            Some(self.acquire_shared_lock(&lock_path)?)
        };

        let mut manifest = File::open(path).map_err(|e| not_found_or_io(e, relative_path))?;
        let mut temp = tempfile::Builder::new()
            .prefix(".tmp.repodata.json.")
            .tempfile_in(&self.temp_dir)?;
        io::copy(&mut manifest, temp.as_file_mut())?;
        temp.as_file_mut().seek(SeekFrom::Start(0))?;

        let (file, temp_path) = temp.into_parts();
        Ok(SourceFile::snapshot(file, temp_path))
    }

    /// Poll for a shared lock on `lock_path` until the configured deadline.
    fn acquire_shared_lock(&self, lock_path: &Path) -> SourceResult<SharedLock> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;

        let started = Instant::now();
        let poll = self
            .lock_retry_interval
            .min(MAX_LOCK_POLL_INTERVAL)
            .max(Duration::from_millis(1));
        let contended_kind = fs2::lock_contended_error().kind();

        loop {
            // Fully qualified: std's own File locking methods would shadow
            // the fs2 trait methods on newer toolchains.
            match FileExt::try_lock_shared(&file) {
                Ok(()) => {
                    debug!(lock = %lock_path.display(), "acquired shared manifest lock");
                    return Ok(SharedLock { file });
                }
                Err(e) if e.kind() == contended_kind => {}
                Err(e) => return Err(SourceError::Io(e)),
            }

            if started.elapsed() >= self.lock_max_wait {
                return Err(SourceError::LockTimeout {
                    path: lock_path.to_path_buf(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            std::thread::sleep(poll);
        }
    }
}

#[async_trait]
impl ChannelFileSource for LocalFileSource {
    async fn open(&self, relative_path: &str) -> SourceResult<SourceFile> {
        let source = self.clone();
        let relative_path = relative_path.to_string();
        tokio::task::spawn_blocking(move || source.open_sync(&relative_path))
            .await
            .map_err(|e| {
                SourceError::Io(io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }
}

/// A held shared advisory lock, released on drop.
struct SharedLock {
    file: File,
}

impl Drop for SharedLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn not_found_or_io(err: io::Error, relative_path: &str) -> SourceError {
    if err.kind() == io::ErrorKind::NotFound {
        SourceError::NotFound(relative_path.to_string())
    } else {
        SourceError::Io(err)
    }
}

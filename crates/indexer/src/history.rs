//! Persistent per-subdirectory state files.
//!
//! The three state files (`repodata.json.history`, `kafkadocs.json`,
//! `kafkadocs.json.history`) share the same discipline: read the whole
//! file, replace it atomically via a temp sibling and rename.

use crate::error::{IndexError, IndexResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// Load a JSON state file, creating an empty one when absent.
///
/// The eagerly written empty file keeps the workdir layout complete even
/// when the rest of the run fails; it is overwritten on commit.
pub async fn load_or_init<T>(path: &Path) -> IndexResult<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| IndexError::State {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "state file absent, creating an empty one");
            let value = T::default();
            let bytes = serde_json::to_vec(&value)?;
            fs::write(path, bytes).await.map_err(|e| IndexError::State {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
            Ok(value)
        }
        Err(e) => Err(IndexError::State {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

/// Atomically replace `path` with the JSON serialization of `value`.
///
/// Writes a `.tmp.<uuid>` sibling, fsyncs, then renames over the target so
/// readers never observe a half-written file.
pub async fn commit<T: Serialize>(path: &Path, value: &T) -> IndexResult<()> {
    let bytes = serde_json::to_vec(value)?;
    let temp_path = temp_sibling(path);

    let written: std::io::Result<()> = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(source) = written {
        let _ = fs::remove_file(&temp_path).await;
        return Err(IndexError::Commit {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let suffix = format!(".tmp.{}", Uuid::new_v4());
    path.with_file_name(
        path.file_name()
            .map(|name| format!("{}{}", name.to_string_lossy(), suffix))
            .unwrap_or_else(|| suffix.clone()),
    )
}

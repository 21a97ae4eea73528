//! The subdirectory indexing engine.

use crate::diff::{PackageAction, package_action};
use crate::document::{self, METADATA_FILENAME};
use crate::error::{IndexError, IndexResult};
use crate::extract;
use crate::history;
use crate::summary::RunSummary;
use rlookup_core::catalog::{DocCatalog, DocEntry, doc_id};
use rlookup_core::config::SubdirConfig;
use rlookup_core::hash::ChecksumKind;
use rlookup_core::repodata::{PackageRecord, Repodata};
use rlookup_core::{CATALOG_FILENAME, REPODATA_FILENAME, REPODATA_HISTORY_FILENAME};
use rlookup_source::ChannelFileSource;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Archive members extracted from every package.
pub const EXTRACT_ALLOWLIST: [&str; 4] = [
    "info/about.json",
    "info/index.json",
    "info/files",
    "info/paths.json",
];

/// Index one subdirectory: diff the current manifest against the committed
/// history, re-extract changed packages and rebuild their metadata
/// documents, record deletions, then commit the new history and catalog
/// atomically (history first).
///
/// A package name lands in the committed history only when its full
/// pipeline completed, so a crash or per-package failure guarantees a retry
/// on the next run. Per-package failures are logged and counted; only
/// workdir, state-file, manifest, and commit failures abort the
/// subdirectory.
pub async fn index_subdir(
    subdir: &SubdirConfig,
    prefix_dir: &Path,
    server_name: &str,
    source: &dyn ChannelFileSource,
) -> IndexResult<RunSummary> {
    let workdir = prefix_dir.join(&subdir.relative_location);
    tokio::fs::create_dir_all(&workdir)
        .await
        .map_err(|source| IndexError::Workdir {
            path: workdir.clone(),
            source,
        })?;

    let history_path = workdir.join(REPODATA_HISTORY_FILENAME);
    let catalog_path = workdir.join(CATALOG_FILENAME);

    let history: Repodata = history::load_or_init(&history_path).await?;
    // The catalog is carried over and mutated: entries for packages this run
    // does not touch stay valid for the publisher.
    let mut catalog: DocCatalog = history::load_or_init(&catalog_path).await?;

    let manifest_rel = join_rel(&subdir.relative_location, REPODATA_FILENAME);
    let manifest = read_manifest(source, &manifest_rel).await?;

    let mut success = Repodata::default();
    let mut summary = RunSummary {
        old: history.packages.len(),
        current: manifest.packages.len(),
        ..RunSummary::default()
    };

    for (name, record) in &manifest.packages {
        let action = match package_action(history.packages.get(name), record) {
            Ok(action) => action,
            Err(err) => {
                summary.skipped += 1;
                warn!(package = %name, error = %err, "skipping package");
                continue;
            }
        };

        match action {
            PackageAction::Update { kind, expected } => {
                // Assume failure; cleared again when the package completes.
                summary.failed += 1;

                let package_rel = join_rel(&subdir.relative_location, name);
                info!(package = %package_rel, "updating package");
                let id = doc_id(server_name, &subdir.relative_location, name);

                let staged = stage_package(
                    source,
                    &package_rel,
                    workdir.join(name),
                    id.clone(),
                    kind,
                    expected,
                    record.clone(),
                    subdir.extra_data.clone(),
                )
                .await;

                match staged {
                    Ok(doc_sha256) => {
                        catalog.docs.insert(
                            id,
                            DocEntry {
                                path: format!("{name}/{METADATA_FILENAME}"),
                                sha256: doc_sha256,
                            },
                        );
                        success.packages.insert(name.clone(), record.clone());
                        summary.updated += 1;
                        summary.failed -= 1;
                        info!(package = %package_rel, "package updated");
                    }
                    Err(err) => {
                        error!(package = %package_rel, error = %err, "could not extract and index package");
                    }
                }
            }
            PackageAction::NoChange => {
                summary.up_to_date += 1;
                success.packages.insert(name.clone(), record.clone());
            }
        }
    }

    for name in history.packages.keys() {
        if manifest.packages.contains_key(name) {
            continue;
        }
        // Best-effort: a leftover directory is overwritten if the package
        // ever comes back.
        let extracted_dir = workdir.join(name);
        if tokio::fs::try_exists(&extracted_dir).await.unwrap_or(false) {
            let _ = tokio::fs::remove_dir_all(&extracted_dir).await;
        }

        info!(package = %join_rel(&subdir.relative_location, name), "deleting package");
        catalog
            .docs
            .insert(doc_id(server_name, &subdir.relative_location, name), DocEntry::deletion());
        summary.deleted += 1;
    }

    history::commit(&history_path, &success).await?;
    history::commit(&catalog_path, &catalog).await?;

    info!(subdir = %subdir.relative_location, %summary, "indexing summary");
    Ok(summary)
}

/// Fetch one package archive, extract and verify it, and build its metadata
/// document. Returns the document's hex SHA-256.
///
/// The extraction and document assembly are synchronous and run on the
/// blocking pool.
#[allow(clippy::too_many_arguments)]
async fn stage_package(
    source: &dyn ChannelFileSource,
    package_rel: &str,
    dest_dir: PathBuf,
    id: String,
    kind: ChecksumKind,
    expected: String,
    record: PackageRecord,
    extra: Map<String, Value>,
) -> IndexResult<String> {
    let archive = source.open(package_rel).await?;

    tokio::task::spawn_blocking(move || {
        let actual = extract::extract_and_hash(archive, &dest_dir, &EXTRACT_ALLOWLIST, kind)?;
        if !expected.is_empty() && actual != expected {
            return Err(IndexError::ChecksumMismatch {
                kind,
                expected,
                actual,
            });
        }
        document::build_document(&dest_dir, &id, &record, &extra)
    })
    .await
    .map_err(|e| IndexError::Task(e.to_string()))?
}

async fn read_manifest(
    source: &dyn ChannelFileSource,
    relative_path: &str,
) -> IndexResult<Repodata> {
    let file = source.open(relative_path).await?;
    tokio::task::spawn_blocking(move || {
        serde_json::from_reader::<_, Repodata>(std::io::BufReader::new(file))
            .map_err(|e| IndexError::ManifestParse(e.to_string()))
    })
    .await
    .map_err(|e| IndexError::Task(e.to_string()))?
}

/// Join server-relative path segments with a forward slash; source paths
/// and document ids use `/` on every platform.
fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

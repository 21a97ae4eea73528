//! The publish engine: ship catalog changes to the document bus.

use crate::error::{IndexError, IndexResult};
use crate::history;
use crate::summary::RunSummary;
use bytes::Bytes;
use rlookup_bus::DocumentBus;
use rlookup_core::catalog::{DocCatalog, DocEntry};
use rlookup_core::config::SubdirConfig;
use rlookup_core::{CATALOG_FILENAME, PUBLISHED_CATALOG_FILENAME};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{error, info};

/// Deletion message understood by the search-index consumer.
#[derive(Serialize)]
struct DeleteDoc<'a> {
    id: &'a str,
    es_action: &'a str,
}

/// Publish one subdirectory's catalog: diff against the published-state,
/// emit an upsert or delete per changed id, and commit the new
/// published-state atomically.
///
/// There are no in-run retries: a send failure is logged and counted, and
/// the failing id is left out of the committed published-state so the next
/// run re-attempts it.
pub async fn publish_subdir(
    subdir: &SubdirConfig,
    prefix_dir: &Path,
    bus: &dyn DocumentBus,
) -> IndexResult<RunSummary> {
    let workdir = prefix_dir.join(&subdir.relative_location);
    tokio::fs::create_dir_all(&workdir)
        .await
        .map_err(|source| IndexError::Workdir {
            path: workdir.clone(),
            source,
        })?;

    let published_path = workdir.join(PUBLISHED_CATALOG_FILENAME);
    let catalog_path = workdir.join(CATALOG_FILENAME);

    let published: DocCatalog = history::load_or_init(&published_path).await?;
    let catalog: DocCatalog = history::load_or_init(&catalog_path).await?;

    let mut success = DocCatalog::default();
    let mut summary = RunSummary {
        old: published.docs.len(),
        current: catalog.docs.len(),
        ..RunSummary::default()
    };

    for (id, entry) in &catalog.docs {
        let changed = published
            .docs
            .get(id)
            .is_none_or(|old| old.sha256 != entry.sha256);
        if !changed {
            summary.up_to_date += 1;
            success.docs.insert(id.clone(), entry.clone());
            continue;
        }

        // Assume failure; cleared again once the broker acknowledges.
        summary.failed += 1;

        let sent = if entry.is_deletion() {
            send_delete(bus, id).await
        } else {
            send_document(bus, &workdir, entry).await
        };

        match sent {
            Ok(()) => {
                if entry.is_deletion() {
                    summary.deleted += 1;
                }
                summary.updated += 1;
                summary.failed -= 1;
                success.docs.insert(id.clone(), entry.clone());
            }
            Err(err) => {
                error!(id = %id, error = %err, "could not publish document");
            }
        }
    }

    history::commit(&published_path, &success).await?;

    info!(subdir = %subdir.relative_location, %summary, "publish summary");
    Ok(summary)
}

async fn send_delete(bus: &dyn DocumentBus, id: &str) -> IndexResult<()> {
    let payload = serde_json::to_vec(&DeleteDoc {
        id,
        es_action: "delete",
    })?;
    bus.send(Bytes::from(payload)).await?;
    info!(id = %id, "sent deletion document to bus");
    Ok(())
}

async fn send_document(
    bus: &dyn DocumentBus,
    workdir: &Path,
    entry: &DocEntry,
) -> IndexResult<()> {
    let path = workdir.join(&entry.path);
    let bytes = tokio::fs::read(&path).await?;
    // Re-serialize so the payload is exactly one canonical JSON object no
    // matter how the document was formatted on disk.
    let doc: Map<String, Value> = serde_json::from_slice(&bytes)?;
    let payload = serde_json::to_vec(&doc)?;
    bus.send(Bytes::from(payload)).await?;
    info!(path = %path.display(), "sent document to bus");
    Ok(())
}

//! Document catalogs: what the indexer produced and what the bus has seen.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Locator and content hash for one on-disk metadata document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocEntry {
    /// Path of the document relative to the subdirectory workdir.
    pub path: String,
    /// SHA-256 of the document bytes.
    pub sha256: String,
}

impl DocEntry {
    /// The deletion sentinel: both fields empty.
    ///
    /// The publisher turns sentinel entries into delete messages.
    pub fn deletion() -> Self {
        Self::default()
    }

    /// Whether this entry marks a deleted document.
    pub fn is_deletion(&self) -> bool {
        self.path.is_empty() && self.sha256.is_empty()
    }
}

/// Mapping from document id to catalog entry.
///
/// The same shape serves as the indexer's output catalog and as the
/// publisher's committed published-state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DocCatalog {
    pub docs: BTreeMap<String, DocEntry>,
}

/// Derive the stable document id for a package archive.
///
/// Slash-joined regardless of platform so ids stay stable as bus primary
/// keys.
pub fn doc_id(server: &str, subdir: &str, name: &str) -> String {
    format!("{server}/{subdir}/{name}")
}

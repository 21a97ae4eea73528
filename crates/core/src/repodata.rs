//! Loosely typed repodata manifest model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single package record from a repodata manifest.
///
/// Records are deliberately loose: only `sha256` and `md5` are interpreted
/// by the indexer, every other field passes through verbatim into the
/// assembled metadata document, so fields added to the repository format do
/// not require changes here.
pub type PackageRecord = serde_json::Map<String, Value>;

/// The subset of a repodata manifest the indexer cares about.
///
/// Doubles as the on-disk schema of the indexing history file: a history is
/// simply the subset of a past manifest whose packages were fully processed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Repodata {
    /// Package archive filename (e.g. `foo-1.2-0.tar.bz2`) to record.
    pub packages: BTreeMap<String, PackageRecord>,
}

/// The `sha256` field of a record, when present and a string.
pub fn record_sha256(record: &PackageRecord) -> Option<&str> {
    record.get("sha256").and_then(Value::as_str)
}

/// The `md5` field of a record, when present and a string.
pub fn record_md5(record: &PackageRecord) -> Option<&str> {
    record.get("md5").and_then(Value::as_str)
}

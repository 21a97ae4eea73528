//! Core domain types and shared logic for the rlookup indexer.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Loosely typed repodata manifests and package records
//! - Document catalogs and the deletion sentinel
//! - Content hashing and archive checksum kinds
//! - Application configuration

pub mod catalog;
pub mod config;
pub mod error;
pub mod hash;
pub mod repodata;

pub use catalog::{DocCatalog, DocEntry, doc_id};
pub use error::{Error, Result};
pub use hash::{Checksum, ChecksumKind, ContentHash, ContentHasher};
pub use repodata::{PackageRecord, Repodata};

/// Basename of the manifest file within a subdirectory.
pub const REPODATA_FILENAME: &str = "repodata.json";

/// Basename of the per-subdirectory indexing history file.
pub const REPODATA_HISTORY_FILENAME: &str = "repodata.json.history";

/// Basename of the per-subdirectory document catalog file.
pub const CATALOG_FILENAME: &str = "kafkadocs.json";

/// Basename of the per-subdirectory published-state file.
pub const PUBLISHED_CATALOG_FILENAME: &str = "kafkadocs.json.history";

//! Shared fixtures for indexer integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use bzip2::Compression;
use bzip2::write::BzEncoder;
use rlookup_bus::{BusError, BusResult, DocumentBus};
use rlookup_core::ContentHash;
use rlookup_core::config::SubdirConfig;
use rlookup_source::LocalFileSource;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const SERVER_NAME: &str = "conda-master";
pub const SUBDIR_REL: &str = "base/linux-64";

/// Build a bzip2-compressed tar archive from (member name, contents) pairs.
pub fn build_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = BzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *contents).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// An archive carrying the four standard metadata members plus payload.
/// `marker` lands in `about.json` so different versions produce different
/// archive bytes.
pub fn standard_archive(marker: &str) -> Vec<u8> {
    let about = format!(r#"{{"license":"BSD","summary":"{marker}"}}"#);
    build_archive(&[
        ("info/about.json", about.as_bytes()),
        ("info/index.json", br#"{"name":"a","version":"1.0"}"#),
        ("info/files", b"lib/a.so\nbin/a\n"),
        (
            "info/paths.json",
            br#"{"paths":[{"_path":"lib/a.so"},{"_path":"bin/a"}]}"#,
        ),
        ("lib/a.so", b"\x7fELF"),
    ])
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    ContentHash::compute(bytes).to_hex()
}

/// Write one package archive under the standard subdirectory.
pub fn write_archive(server_root: &Path, name: &str, bytes: &[u8]) {
    let dir = server_root.join(SUBDIR_REL);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), bytes).unwrap();
}

/// Write the subdirectory manifest with the given `packages` object.
pub fn write_manifest(server_root: &Path, packages: Value) {
    let dir = server_root.join(SUBDIR_REL);
    std::fs::create_dir_all(&dir).unwrap();
    let manifest = json!({ "packages": packages });
    std::fs::write(
        dir.join("repodata.json"),
        serde_json::to_vec(&manifest).unwrap(),
    )
    .unwrap();
}

pub fn subdir_config() -> SubdirConfig {
    SubdirConfig {
        name: "linux-64".to_string(),
        relative_location: SUBDIR_REL.to_string(),
        extra_data: serde_json::Map::new(),
    }
}

/// A lock-free local source with short timeouts, suitable for tests.
pub fn local_source(server_root: &Path, temp_dir: &Path) -> LocalFileSource {
    LocalFileSource::new(
        server_root,
        temp_dir,
        "",
        Duration::from_millis(200),
        Duration::from_millis(50),
    )
}

/// In-memory bus capturing every payload; can be switched into a failing
/// mode to exercise retry behavior.
pub struct MockBus {
    pub sent: Mutex<Vec<Vec<u8>>>,
    pub fail: AtomicBool,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|bytes| serde_json::from_slice(bytes).unwrap())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentBus for MockBus {
    async fn send(&self, payload: Bytes) -> BusResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BusError::Config("mock bus failure".to_string()));
        }
        self.sent.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

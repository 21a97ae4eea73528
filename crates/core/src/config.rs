//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// The package server to index.
    #[serde(default)]
    pub server: ServerConfig,
    /// The downstream message bus.
    #[serde(default)]
    pub bus: BusConfig,
    /// Enable debug logging.
    #[serde(default)]
    pub debug: bool,
}

/// One conda-layout package server: a collection of channels under a single
/// directory (local) or base url (remote).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server name, prepended to every document id.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Base URL for a remote server. Remote sources are contract-only; a
    /// non-empty url is rejected at source construction.
    #[serde(default)]
    pub url: String,
    /// Root directory of a local server tree.
    #[serde(default = "default_server_path")]
    pub path: PathBuf,
    /// Directory the indexer owns for histories, catalogs, and extracted
    /// package metadata.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    /// Basename of the advisory lock file adjacent to each manifest
    /// (e.g. `.repodata.lock`). Empty disables manifest locking.
    #[serde(default)]
    pub repodata_lock_filename: String,
    /// Total time to wait for the manifest lock before giving up.
    #[serde(default = "default_lock_max_wait")]
    pub repodata_lock_max_wait_seconds: u64,
    /// Interval between lock acquisition attempts.
    #[serde(default = "default_lock_retry_interval")]
    pub repodata_lock_retry_interval_seconds: u64,
    /// Channels to index, keyed by a free-form label.
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

impl ServerConfig {
    /// Get the manifest lock deadline as a Duration.
    pub fn lock_max_wait(&self) -> Duration {
        Duration::from_secs(self.repodata_lock_max_wait_seconds)
    }

    /// Get the lock retry interval as a Duration.
    pub fn lock_retry_interval(&self) -> Duration {
        Duration::from_secs(self.repodata_lock_retry_interval_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            url: String::new(),
            path: default_server_path(),
            workdir: default_workdir(),
            repodata_lock_filename: String::new(),
            repodata_lock_max_wait_seconds: default_lock_max_wait(),
            repodata_lock_retry_interval_seconds: default_lock_retry_interval(),
            channels: BTreeMap::new(),
        }
    }
}

/// A named group of subdirectories.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub name: String,
    /// Location of the channel relative to the server root.
    pub relative_location: String,
    /// Platform subdirectories, keyed by a free-form label.
    #[serde(default)]
    pub subdirs: BTreeMap<String, SubdirConfig>,
}

/// One platform bucket within a channel (e.g. `linux-64`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubdirConfig {
    #[serde(default)]
    pub name: String,
    /// Location of the subdirectory relative to the server root, including
    /// the channel segment (e.g. `base/linux-64`).
    pub relative_location: String,
    /// Fields merged into every metadata document built for this
    /// subdirectory, overriding manifest fields of the same name.
    #[serde(default)]
    pub extra_data: Map<String, Value>,
}

/// Connection settings for the downstream message bus.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BusConfig {
    /// Broker addresses, `host:port`.
    #[serde(default)]
    pub brokers: Vec<String>,
    /// Topic every message is produced to.
    #[serde(default)]
    pub topic: String,
    /// Enable TLS towards the brokers.
    #[serde(default)]
    pub tls_enabled: bool,
    /// Client certificate (PEM). Required when TLS is enabled.
    #[serde(default)]
    pub tls_cert_file: Option<PathBuf>,
    /// Client private key (PEM). Required when TLS is enabled.
    #[serde(default)]
    pub tls_key_file: Option<PathBuf>,
    /// Disable broker certificate verification.
    #[serde(default)]
    pub tls_skip_verify: bool,
    /// CA bundle used to verify the brokers.
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
}

impl BusConfig {
    /// Validate bus configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.tls_enabled && (self.tls_cert_file.is_none() || self.tls_key_file.is_none()) {
            return Err(
                "bus TLS requires both tls_cert_file and tls_key_file when enabled".to_string(),
            );
        }
        Ok(())
    }
}

fn default_server_name() -> String {
    "conda-master".to_string()
}

fn default_server_path() -> PathBuf {
    PathBuf::from("conda-forge")
}

fn default_workdir() -> PathBuf {
    PathBuf::from("workdir")
}

fn default_lock_max_wait() -> u64 {
    20
}

fn default_lock_retry_interval() -> u64 {
    2
}

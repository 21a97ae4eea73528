//! File source abstraction over a conda-layout server tree.
//!
//! This crate provides:
//! - The [`ChannelFileSource`] trait: uniform read access to manifests and
//!   package archives by server-relative path
//! - Manifest snapshotting under a shared advisory lock, so a concurrent
//!   publisher rewriting `repodata.json` is never observed half-written
//! - A local filesystem backend

pub mod error;
pub mod local;
pub mod traits;

pub use error::{SourceError, SourceResult};
pub use local::LocalFileSource;
pub use traits::{ChannelFileSource, SourceFile};

use rlookup_core::config::ServerConfig;
use std::sync::Arc;

/// Create a channel file source from server configuration.
///
/// Only local (path-backed) servers are supported; a configured `url` is
/// rejected. The [`ChannelFileSource`] trait is the complete contract a
/// remote backend would implement.
pub fn from_config(config: &ServerConfig) -> SourceResult<Arc<dyn ChannelFileSource>> {
    if !config.url.is_empty() {
        return Err(SourceError::Config(
            "remote (url) servers are not supported; configure server.path".to_string(),
        ));
    }
    Ok(Arc::new(LocalFileSource::from_server_config(config)))
}

//! Message bus abstraction feeding the downstream search index.
//!
//! This crate provides:
//! - The [`DocumentBus`] trait: send one payload and await acknowledgment
//! - A Kafka-backed producer implementation

pub mod error;
pub mod kafka;
pub mod traits;

pub use error::{BusError, BusResult};
pub use kafka::KafkaBus;
pub use traits::DocumentBus;

use rlookup_core::config::BusConfig;
use std::sync::Arc;

/// Create a document bus from configuration.
pub fn from_config(config: &BusConfig) -> BusResult<Arc<dyn DocumentBus>> {
    Ok(Arc::new(KafkaBus::new(config)?))
}

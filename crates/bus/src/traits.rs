//! Bus trait definitions.

use crate::error::BusResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Downstream message bus used to feed a search index.
#[async_trait]
pub trait DocumentBus: Send + Sync + 'static {
    /// Send one message payload and wait for broker acknowledgment.
    ///
    /// No message key is set; partition selection is delegated to the
    /// client's balancer.
    async fn send(&self, payload: Bytes) -> BusResult<()>;
}

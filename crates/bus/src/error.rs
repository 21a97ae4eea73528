//! Bus error types.

use thiserror::Error;

/// Bus operation errors.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus configuration error: {0}")]
    Config(String),

    #[error("bus client error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// Result type for bus operations.
pub type BusResult<T> = std::result::Result<T, BusError>;

//! Kafka-backed document bus.

use crate::error::{BusError, BusResult};
use crate::traits::DocumentBus;
use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rlookup_core::config::BusConfig;
use tracing::debug;

/// Maximum message size accepted by the producer (50 MiB); metadata
/// documents for large packages can run well past the broker default.
const MAX_MESSAGE_BYTES: usize = 50 * 1024 * 1024;

/// Document bus over a Kafka producer.
pub struct KafkaBus {
    producer: FutureProducer,
    topic: String,
}

impl KafkaBus {
    /// Build a producer from bus configuration.
    pub fn new(config: &BusConfig) -> BusResult<Self> {
        config.validate().map_err(BusError::Config)?;
        if config.brokers.is_empty() {
            return Err(BusError::Config("no bus brokers configured".to_string()));
        }
        if config.topic.is_empty() {
            return Err(BusError::Config("no bus topic configured".to_string()));
        }

        let mut client = ClientConfig::new();
        client
            .set("bootstrap.servers", config.brokers.join(","))
            .set("message.max.bytes", MAX_MESSAGE_BYTES.to_string());

        if config.tls_enabled {
            client.set("security.protocol", "ssl");
            if let Some(cert) = &config.tls_cert_file {
                client.set("ssl.certificate.location", cert.display().to_string());
            }
            if let Some(key) = &config.tls_key_file {
                client.set("ssl.key.location", key.display().to_string());
            }
            if let Some(ca) = &config.ca_file {
                client.set("ssl.ca.location", ca.display().to_string());
            }
            if config.tls_skip_verify {
                client.set("enable.ssl.certificate.verification", "false");
            }
        }

        let producer: FutureProducer = client.create()?;
        debug!(topic = %config.topic, brokers = ?config.brokers, "bus producer created");

        Ok(Self {
            producer,
            topic: config.topic.clone(),
        })
    }
}

#[async_trait]
impl DocumentBus for KafkaBus {
    async fn send(&self, payload: Bytes) -> BusResult<()> {
        let record: FutureRecord<'_, (), [u8]> =
            FutureRecord::to(&self.topic).payload(payload.as_ref());
        self.producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(err, _message)| BusError::Kafka(err))?;
        Ok(())
    }
}

//! Publishing with delivery acknowledgement
//!
//! The send future resolves only once the broker has acknowledged the
//! message, so a successful [`Publisher::publish`] is a durability
//! guarantee at whatever level the broker itself provides.

use crate::config::GatewayConfig;
use crate::{client, Result};
use rdkafka::message::OwnedHeaders;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::debug;

/// One-call producer session
pub struct Publisher {
    producer: FutureProducer,
    delivery_timeout: Duration,
}

impl Publisher {
    /// Create a producer for one call
    pub fn connect(config: &GatewayConfig) -> Result<Self> {
        let producer: FutureProducer = client::producer_config(config).create()?;

        Ok(Self {
            producer,
            delivery_timeout: config.request_timeout(),
        })
    }

    /// Append one message and wait for the broker's acknowledgement
    ///
    /// Headers are passed through verbatim; no transformation is applied.
    /// Returns the broker-assigned (partition, offset).
    pub async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
        headers: OwnedHeaders,
    ) -> Result<(i32, i64)> {
        let mut record: FutureRecord<'_, str, [u8]> =
            FutureRecord::to(topic).payload(payload).headers(headers);

        if let Some(key) = key {
            record = record.key(key);
        }

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.delivery_timeout))
            .await
            .map_err(|(err, _)| err)?;

        debug!(topic, partition, offset, bytes = payload.len(), "message delivered");
        Ok((partition, offset))
    }
}

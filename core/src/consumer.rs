//! Earliest-offset topic consumption
//!
//! Every session assigns all partitions at `Offset::Beginning` and never
//! commits, so a drain is an at-least-once snapshot of whatever the broker
//! currently retains.

use crate::config::GatewayConfig;
use crate::{client, GatemqError, Result};
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Headers, Message};
use rdkafka::topic_partition_list::TopicPartitionList;
use rdkafka::Offset;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::debug;

/// Owned rendering of one consumed message
#[derive(Debug, Clone)]
pub struct ConsumedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub headers: Vec<(String, Vec<u8>)>,
}

impl ConsumedMessage {
    /// Copy a borrowed rdkafka message into an owned rendering
    pub fn from_borrowed(message: &BorrowedMessage<'_>) -> Self {
        let headers = message
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .map(|header| {
                        (
                            header.key.to_string(),
                            header.value.map(<[u8]>::to_vec).unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message
                .key()
                .map(|key| String::from_utf8_lossy(key).into_owned()),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            headers,
        }
    }

    /// JSON rendering for the consumption endpoint
    pub fn render(&self) -> Value {
        let headers: Value = self
            .headers
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    Value::String(String::from_utf8_lossy(value).into_owned()),
                )
            })
            .collect::<serde_json::Map<_, _>>()
            .into();

        json!({
            "topic": self.topic,
            "partition": self.partition,
            "offset": self.offset,
            "key": self.key,
            "headers": headers,
            "value": crate::protocol::render_body(&self.payload),
        })
    }
}

/// One consumer session positioned at the earliest retained offset
pub struct ScanSession {
    consumer: StreamConsumer,
    topic: String,
}

impl ScanSession {
    /// Open a session on `topic`, assigned to every partition at Beginning
    ///
    /// Partitions are resolved from a live metadata fetch; a topic the
    /// broker does not know (no partitions) is reported as not found.
    pub fn open(config: &GatewayConfig, topic: &str) -> Result<Self> {
        let consumer: StreamConsumer = client::consumer_config(config).create()?;

        let metadata = consumer.fetch_metadata(Some(topic), config.metadata_timeout())?;
        let partitions: Vec<i32> = metadata
            .topics()
            .iter()
            .find(|t| t.name() == topic)
            .map(|t| t.partitions().iter().map(|p| p.id()).collect())
            .unwrap_or_default();

        if partitions.is_empty() {
            return Err(GatemqError::TopicNotFound(topic.to_string()));
        }

        let mut assignment = TopicPartitionList::new();
        for partition in partitions {
            assignment.add_partition_offset(topic, partition, Offset::Beginning)?;
        }
        consumer.assign(&assignment)?;

        Ok(Self {
            consumer,
            topic: topic.to_string(),
        })
    }

    /// Receive the next message, or `None` once `idle` elapses without one
    pub async fn next_message(&self, idle: Duration) -> Result<Option<BorrowedMessage<'_>>> {
        match tokio::time::timeout(idle, self.consumer.recv()).await {
            Err(_) => Ok(None),
            Ok(Err(err)) => Err(err.into()),
            Ok(Ok(message)) => Ok(Some(message)),
        }
    }

    /// Topic this session scans
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Collect every currently retained message of `topic`
///
/// Collection stops once `idle` elapses with no new message: a best-effort
/// snapshot, not a guaranteed-complete dump of a topic under write.
pub async fn drain_topic(
    config: &GatewayConfig,
    topic: &str,
    idle: Duration,
) -> Result<Vec<ConsumedMessage>> {
    let session = ScanSession::open(config, topic)?;
    let started = Instant::now();
    let mut messages = Vec::new();

    while let Some(message) = session.next_message(idle).await? {
        messages.push(ConsumedMessage::from_borrowed(&message));
    }

    debug!(
        topic,
        count = messages.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "topic drained"
    );
    Ok(messages)
}

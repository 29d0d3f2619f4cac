//! Topic catalog: listing, existence checks, and creation
//!
//! Existence is always answered from a fresh metadata fetch; topics may be
//! created concurrently by other processes, so nothing is cached beyond
//! one call.

use crate::config::{GatewayConfig, TopicSpec};
use crate::{client, GatemqError, Result};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::types::RDKafkaErrorCode;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::info;

/// Catalog over one broker connection, dropped at call end
pub struct TopicCatalog {
    consumer: BaseConsumer,
    admin: AdminClient<DefaultClientContext>,
    metadata_timeout: Duration,
}

impl TopicCatalog {
    /// Connect a fresh catalog session
    pub fn connect(config: &GatewayConfig) -> Result<Self> {
        let consumer: BaseConsumer = client::consumer_config(config).create()?;
        let admin: AdminClient<DefaultClientContext> = client::base_config(config).create()?;

        Ok(Self {
            consumer,
            admin,
            metadata_timeout: config.metadata_timeout(),
        })
    }

    /// List all topic names known to the broker
    pub fn list_topics(&self) -> Result<BTreeSet<String>> {
        let metadata = self
            .consumer
            .fetch_metadata(None, self.metadata_timeout)?;

        Ok(metadata
            .topics()
            .iter()
            .map(|topic| topic.name().to_string())
            .collect())
    }

    /// Membership test against a fresh listing
    pub fn topic_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_topics()?.contains(name))
    }

    /// Create one topic, failing when it already exists
    pub async fn create_topic(&self, spec: &TopicSpec) -> Result<()> {
        if self.topic_exists(&spec.name)? {
            return Err(GatemqError::TopicExists(spec.name.clone()));
        }
        self.create_topics(std::slice::from_ref(spec)).await
    }

    /// Create a batch of topics in one administrative call
    ///
    /// A per-topic already-exists result is treated as success so that
    /// concurrent provisioners converge; any other per-topic error is
    /// surfaced.
    pub async fn create_topics(&self, specs: &[TopicSpec]) -> Result<()> {
        if specs.is_empty() {
            return Ok(());
        }

        let new_topics: Vec<NewTopic<'_>> = specs
            .iter()
            .map(|spec| {
                NewTopic::new(
                    &spec.name,
                    spec.partitions,
                    TopicReplication::Fixed(spec.replication),
                )
            })
            .collect();

        let options =
            AdminOptions::new().operation_timeout(Some(Duration::from_secs(5)));

        let results = self.admin.create_topics(&new_topics, &options).await?;
        for result in results {
            match result {
                Ok(name) => info!(topic = %name, "topic created"),
                Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    info!(topic = %name, "topic already present, skipping")
                }
                Err((name, code)) => {
                    tracing::error!(topic = %name, ?code, "topic creation failed");
                    return Err(GatemqError::Kafka(rdkafka::error::KafkaError::AdminOp(code)));
                }
            }
        }

        Ok(())
    }

    /// Resolve partition metadata for one topic (readiness warmup)
    pub fn partition_count(&self, name: &str) -> Result<usize> {
        let metadata = self
            .consumer
            .fetch_metadata(Some(name), self.metadata_timeout)?;

        Ok(metadata
            .topics()
            .iter()
            .find(|topic| topic.name() == name)
            .map(|topic| topic.partitions().len())
            .unwrap_or(0))
    }
}

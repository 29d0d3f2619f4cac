pub mod settings;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gateway configuration
///
/// Loaded from `GATEMQ_*` environment variables (see [`settings`]); every
/// field has a working default for local development against an
/// unauthenticated broker on `localhost:9092`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Broker bootstrap address list (librdkafka `bootstrap.servers` form)
    pub bootstrap_servers: String,
    /// SASL/PLAIN username; SASL is wired only when this is set
    pub sasl_username: Option<String>,
    /// SASL/PLAIN password
    pub sasl_password: Option<String>,
    /// librdkafka `security.protocol`; when unset, derived from credentials
    pub security_protocol: Option<String>,

    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,

    /// Overall deadline for a correlated request/reply round trip, seconds
    pub request_timeout_secs: u64,
    /// Per-poll idle timeout for topic drains and reply scans, milliseconds
    pub poll_idle_ms: u64,
    /// Timeout for metadata fetches, milliseconds
    pub metadata_timeout_ms: u64,

    /// Topics created at startup, comma or whitespace separated
    pub init_topics: String,
    /// Partition count for startup-created topics
    pub init_topic_partitions: i32,
    /// Replication factor for startup-created topics
    pub init_topic_replication: i32,

    /// Producer max request size and HTTP body cap, bytes
    pub max_request_bytes: usize,

    /// Readiness sentinel path, touched once bootstrap completes
    pub ready_file: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            sasl_username: None,
            sasl_password: None,
            security_protocol: None,
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            poll_idle_ms: 2000,
            metadata_timeout_ms: 5000,
            init_topics: String::new(),
            init_topic_partitions: 1,
            init_topic_replication: 1,
            max_request_bytes: 10_000_000, // generous cap for clinical/document payloads
            ready_file: "ready".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Overall request/reply deadline
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Idle timeout bounding one consumer poll
    pub fn poll_idle(&self) -> Duration {
        Duration::from_millis(self.poll_idle_ms)
    }

    /// Metadata fetch timeout
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    /// Topic specs to provision at startup
    ///
    /// The list accepts comma or whitespace separation; empty segments are
    /// dropped, so `"a,b c"` and `"a, b, c"` both yield three topics.
    pub fn initial_topics(&self) -> Vec<TopicSpec> {
        self.init_topics
            .replace(',', " ")
            .split_whitespace()
            .map(|name| TopicSpec {
                name: name.to_string(),
                partitions: self.init_topic_partitions,
                replication: self.init_topic_replication,
            })
            .collect()
    }

    /// Effective `security.protocol` for librdkafka
    ///
    /// Explicit configuration wins; otherwise SASL_PLAINTEXT when
    /// credentials are present, PLAINTEXT when not.
    pub fn effective_security_protocol(&self) -> &str {
        if let Some(protocol) = &self.security_protocol {
            return protocol;
        }
        if self.sasl_username.is_some() {
            "SASL_PLAINTEXT"
        } else {
            "PLAINTEXT"
        }
    }
}

/// A topic to provision: name plus creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication: i32,
}

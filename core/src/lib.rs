//! # Gatemq Core Library
//!
//! Gatemq is a synchronous HTTP request/reply gateway in front of Kafka
//! topics. It lets a plain HTTP caller publish into an asynchronous
//! pipeline and wait for the pipeline's reply, correlated by a per-request
//! token, without holding any state of its own.
//!
//! ## Architecture Overview
//!
//! The gateway is built from a small set of per-call components:
//!
//! - [`bootstrap`] - startup provisioning: broker wait, topic creation, readiness
//! - [`admin`] - topic catalog (list / exists / create)
//! - [`producer`] - publishing with delivery acknowledgement
//! - [`consumer`] - earliest-offset topic drains
//! - [`correlation`] - token-correlated reply matching under a deadline
//! - [`http_server`] - the HTTP facade
//! - [`config`] - environment-driven configuration
//!
//! Every HTTP call constructs its own producer and consumer sessions and
//! drops them at completion; nothing is shared across calls except the
//! immutable configuration.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gatemq::{bootstrap, GatewayConfig, HttpGatewayServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> gatemq::Result<()> {
//!     let config = Arc::new(GatewayConfig::default());
//!     bootstrap::run(&config).await?;
//!     HttpGatewayServer::new(config).serve().await
//! }
//! ```

pub mod admin;
pub mod bootstrap;
pub mod client;
pub mod config;
pub mod consumer;
pub mod correlation;
pub mod http_server;
pub mod producer;
pub mod protocol;

pub use admin::TopicCatalog;
pub use config::{GatewayConfig, TopicSpec};
pub use consumer::ConsumedMessage;
pub use correlation::MatchOutcome;
pub use http_server::HttpGatewayServer;
pub use producer::Publisher;

use thiserror::Error;

/// Gatemq error types
///
/// Every caller-visible failure of the gateway maps onto exactly one of
/// these variants; the HTTP facade translates them one-to-one into
/// response statuses.
#[derive(Debug, Error)]
pub enum GatemqError {
    /// Broker/client failures reported by librdkafka
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// A write or create call arrived without a topic parameter
    #[error("no topic supplied")]
    MissingTopic,

    /// The operation targets a topic absent from the catalog
    #[error("topic '{0}' does not exist")]
    TopicNotFound(String),

    /// Create was called on a topic that is already present
    #[error("topic '{0}' already exists")]
    TopicExists(String),

    /// No correlated reply arrived within the request deadline
    #[error("no correlated reply within the deadline")]
    Timeout,

    /// Configuration load or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors (readiness sentinel)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatemqError>;

//! Per-session rdkafka client configuration
//!
//! Every HTTP call builds its own producer/consumer/admin clients from
//! these helpers and drops them when the call completes; there is no
//! process-wide broker handle.

use crate::config::GatewayConfig;
use rdkafka::config::ClientConfig;
use uuid::Uuid;

/// Base librdkafka configuration shared by all client kinds
///
/// Wires bootstrap servers and, when credentials are configured,
/// SASL/PLAIN authentication.
pub fn base_config(config: &GatewayConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();

    client_config.set("bootstrap.servers", &config.bootstrap_servers);
    client_config.set("security.protocol", config.effective_security_protocol());

    if let Some(username) = &config.sasl_username {
        client_config.set("sasl.mechanism", "PLAIN");
        client_config.set("sasl.username", username);
        if let Some(password) = &config.sasl_password {
            client_config.set("sasl.password", password);
        }
    }

    client_config
}

/// Producer configuration: delivery acknowledged, generous request size
pub fn producer_config(config: &GatewayConfig) -> ClientConfig {
    let mut client_config = base_config(config);

    client_config.set("message.max.bytes", config.max_request_bytes.to_string());
    client_config.set(
        "message.timeout.ms",
        config.request_timeout().as_millis().to_string(),
    );

    client_config
}

/// Consumer configuration for one earliest-offset scan session
///
/// Each session gets a throwaway group id and never commits offsets, so
/// repeated reads of the same topic re-observe all retained messages.
pub fn consumer_config(config: &GatewayConfig) -> ClientConfig {
    let mut client_config = base_config(config);

    client_config.set("group.id", format!("gatemq-{}", Uuid::new_v4()));
    client_config.set("enable.auto.commit", "false");
    client_config.set("auto.offset.reset", "earliest");

    client_config
}

//! HTTP facade for the gateway
//!
//! This module provides the request/reply boundary in front of the bus:
//! - Topic listing and earliest-offset consumption
//! - Publishing, fire-and-forget or correlated against a reply topic
//! - On-demand topic creation
//! - Basic health check
//!
//! Each call is validated before anything is dispatched, then runs with
//! its own broker sessions; the shared state is the immutable
//! configuration and nothing else.

use crate::admin::TopicCatalog;
use crate::config::{GatewayConfig, TopicSpec};
use crate::correlation::{self, MatchOutcome};
use crate::producer::Publisher;
use crate::protocol::{self, PipelineFlags};
use crate::{consumer, GatemqError, Result};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

type AppState = Arc<GatewayConfig>;

/// The gateway's HTTP server
pub struct HttpGatewayServer {
    config: Arc<GatewayConfig>,
}

impl HttpGatewayServer {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self { config }
    }

    /// Build the router; separate from [`serve`](Self::serve) for tests
    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthcheck", get(healthcheck))
            .route(
                "/",
                get(list_or_consume).post(produce).put(create_topic),
            )
            .layer(DefaultBodyLimit::max(self.config.max_request_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.config))
    }

    /// Bind and serve until the process is stopped
    pub async fn serve(self) -> Result<()> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&address).await?;
        info!(%address, "gateway listening");

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TopicQuery {
    topic: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProduceQuery {
    topic: Option<String>,
    response_topic: Option<String>,
    failure_topic: Option<String>,
}

/// JSON response whose body always carries the status as a string,
/// mirroring the downstream pipeline's convention
fn respond(status: StatusCode, extra: Value) -> Response {
    let mut body = json!({ "status": status.as_u16().to_string() });
    if let (Value::Object(body), Value::Object(extra)) = (&mut body, extra) {
        body.extend(extra);
    }
    (status, Json(body)).into_response()
}

/// One-to-one translation of gateway errors into caller-visible statuses
fn error_response(err: &GatemqError) -> Response {
    match err {
        GatemqError::TopicNotFound(_) => respond(
            StatusCode::BAD_REQUEST,
            json!({ "message": "Topic not found: selected topic does not exist" }),
        ),
        GatemqError::TopicExists(_) => respond(
            StatusCode::BAD_REQUEST,
            json!({ "message": "Topic already exists: cannot recreate existing topic" }),
        ),
        GatemqError::MissingTopic => respond(
            StatusCode::BAD_REQUEST,
            json!({ "message": "Topic not found: a topic parameter is required" }),
        ),
        GatemqError::Timeout => respond(
            StatusCode::REQUEST_TIMEOUT,
            json!({ "message": err.to_string() }),
        ),
        other => {
            error!(error = %other, "request failed");
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": other.to_string() }),
            )
        }
    }
}

/// A correlated reply mapped onto the HTTP response: the downstream body
/// verbatim, under the downstream (or forced) status
fn reply_response(status: u16, payload: &[u8]) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    (status, Json(protocol::render_body(payload))).into_response()
}

fn supplied(parameter: Option<String>) -> Option<String> {
    parameter.filter(|value| !value.is_empty())
}

async fn healthcheck() -> Response {
    let now = Utc::now().format("%Y-%m-%d %H:%M:%S");
    respond(
        StatusCode::OK,
        json!({ "message": format!("Kafka gateway service is running... {now} GMT") }),
    )
}

/// `GET /`: list topics, or drain one when `topic` is supplied
async fn list_or_consume(
    State(config): State<AppState>,
    Query(query): Query<TopicQuery>,
) -> Response {
    match supplied(query.topic) {
        None => list_topics(&config),
        Some(topic) => consume_topic(&config, &topic).await,
    }
}

fn list_topics(config: &GatewayConfig) -> Response {
    match TopicCatalog::connect(config).and_then(|catalog| catalog.list_topics()) {
        Ok(topics) => respond(StatusCode::OK, json!({ "topics": topics })),
        Err(err) => error_response(&err),
    }
}

async fn consume_topic(config: &GatewayConfig, topic: &str) -> Response {
    let exists = TopicCatalog::connect(config).and_then(|catalog| catalog.topic_exists(topic));
    match exists {
        Ok(true) => {}
        Ok(false) => return error_response(&GatemqError::TopicNotFound(topic.to_string())),
        Err(err) => return error_response(&err),
    }

    match consumer::drain_topic(config, topic, config.poll_idle()).await {
        Ok(messages) => respond(
            StatusCode::OK,
            json!({
                "topic": topic,
                "nummessages": messages.len(),
                "data": messages.iter().map(consumer::ConsumedMessage::render).collect::<Vec<_>>(),
            }),
        ),
        Err(err) => error_response(&err),
    }
}

/// `POST /`: publish, then either acknowledge immediately or wait for
/// the correlated reply
///
/// State machine per call: validate (reject without dispatch when no
/// topic is supplied), dispatch the publish, then complete immediately or
/// await correlation when a reply topic was given.
async fn produce(
    State(config): State<AppState>,
    Query(query): Query<ProduceQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(topic) = supplied(query.topic) else {
        return respond(
            StatusCode::BAD_REQUEST,
            json!({ "message": "Topic not found: must include a topic for produce (POST)" }),
        );
    };

    let reply_topic = supplied(query.response_topic);
    let failure_topic = supplied(query.failure_topic);
    let flags = PipelineFlags::from_http(&headers);

    // The token is minted, and attached, before the send; without it no
    // reply could ever be matched.
    let token = reply_topic.as_ref().map(|_| Uuid::new_v4().to_string());
    let kafka_headers = flags.to_kafka_headers(token.as_deref());

    let publisher = match Publisher::connect(&config) {
        Ok(publisher) => publisher,
        Err(err) => return error_response(&err),
    };
    if let Err(err) = publisher.publish(&topic, None, &body, kafka_headers).await {
        return error_response(&err);
    }

    let (Some(reply_topic), Some(token)) = (reply_topic, token) else {
        return respond(StatusCode::OK, protocol::ack_echo(&topic, &flags, &body));
    };

    let deadline = Instant::now() + config.request_timeout();
    match correlation::await_correlated(
        &config,
        &token,
        &reply_topic,
        failure_topic.as_deref(),
        deadline,
    )
    .await
    {
        Ok(MatchOutcome::Success { body: reply, status })
        | Ok(MatchOutcome::Failure { body: reply, status }) => reply_response(status, &reply),
        Ok(MatchOutcome::TimedOut) => respond(
            StatusCode::REQUEST_TIMEOUT,
            protocol::ack_echo(&topic, &flags, &body),
        ),
        Err(err) => error_response(&err),
    }
}

/// `PUT /`: create a topic on demand
async fn create_topic(
    State(config): State<AppState>,
    Query(query): Query<TopicQuery>,
) -> Response {
    let Some(topic) = supplied(query.topic) else {
        return respond(
            StatusCode::BAD_REQUEST,
            json!({ "message": "Topic not found: must include a topic to create (PUT)" }),
        );
    };

    let spec = TopicSpec {
        name: topic.clone(),
        partitions: 1,
        replication: 1,
    };

    let created = match TopicCatalog::connect(&config) {
        Ok(catalog) => catalog.create_topic(&spec).await,
        Err(err) => Err(err),
    };

    match created {
        Ok(()) => respond(
            StatusCode::OK,
            json!({ "topic": topic, "message": "topic created" }),
        ),
        Err(err) => error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn state() -> AppState {
        Arc::new(GatewayConfig::default())
    }

    #[tokio::test]
    async fn produce_without_topic_is_rejected_before_dispatch() {
        let response = produce(
            State(state()),
            Query(ProduceQuery {
                topic: None,
                response_topic: None,
                failure_topic: None,
            }),
            HeaderMap::new(),
            Bytes::from_static(b"{}"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "400");
    }

    #[tokio::test]
    async fn produce_with_empty_topic_is_rejected() {
        let response = produce(
            State(state()),
            Query(ProduceQuery {
                topic: Some(String::new()),
                response_topic: None,
                failure_topic: None,
            }),
            HeaderMap::new(),
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_without_topic_is_rejected() {
        let response = create_topic(
            State(state()),
            Query(TopicQuery { topic: None }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "Topic not found: must include a topic to create (PUT)"
        );
    }

    #[tokio::test]
    async fn healthcheck_reports_running() {
        let response = healthcheck().await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "200");
        assert!(body["message"]
            .as_str()
            .expect("message")
            .starts_with("Kafka gateway service is running"));
    }

    #[test]
    fn responses_carry_the_status_as_a_string_field() {
        let response = respond(StatusCode::REQUEST_TIMEOUT, json!({ "topic": "in" }));
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn error_translation_is_one_to_one() {
        let not_found = error_response(&GatemqError::TopicNotFound("x".to_string()));
        assert_eq!(not_found.status(), StatusCode::BAD_REQUEST);

        let exists = error_response(&GatemqError::TopicExists("x".to_string()));
        assert_eq!(exists.status(), StatusCode::BAD_REQUEST);

        let timeout = error_response(&GatemqError::Timeout);
        assert_eq!(timeout.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn reply_status_falls_back_when_out_of_range() {
        let response = reply_response(99, b"{}");
        assert_eq!(response.status(), StatusCode::OK);

        let response = reply_response(201, b"{\"b\":2}");
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

//! Facade-level tests
//!
//! Everything up to the broker boundary runs against the router directly;
//! the round-trip scenarios that need a live broker on localhost:9092 are
//! `#[ignore]`d and can be run with `cargo test -- --ignored`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gatemq::{GatewayConfig, HttpGatewayServer};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn server() -> HttpGatewayServer {
    HttpGatewayServer::new(Arc::new(GatewayConfig::default()))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn healthcheck_answers_ok() {
    let response = server()
        .router()
        .oneshot(
            Request::builder()
                .uri("/healthcheck")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "200");
}

#[tokio::test]
async fn produce_without_topic_is_a_400_with_no_dispatch() {
    let response = server()
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .body(Body::from("{\"a\":1}"))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], "400");
    assert_eq!(
        body["message"],
        "Topic not found: must include a topic for produce (POST)"
    );
}

#[tokio::test]
async fn create_without_topic_is_a_400() {
    let response = server()
        .router()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_topic_parameter_counts_as_missing() {
    let response = server()
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/?topic=")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Round-trip scenarios against a live broker.
///
/// These mirror the gateway's contract end to end: a publish with a reply
/// topic returns the downstream body and status; a failure-topic match is
/// never reported as success; silence times out.
mod live {
    use gatemq::correlation::{self, MatchOutcome};
    use gatemq::protocol::{CORRELATION_HEADER, STATUS_HEADER};
    use gatemq::{ConsumedMessage, GatewayConfig, Publisher, TopicCatalog, TopicSpec};
    use rdkafka::message::{Header, OwnedHeaders};
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    fn spec(name: &str) -> TopicSpec {
        TopicSpec {
            name: name.to_string(),
            partitions: 1,
            replication: 1,
        }
    }

    async fn provision(config: &GatewayConfig, topics: &[TopicSpec]) {
        let catalog = TopicCatalog::connect(config).expect("catalog");
        catalog.create_topics(topics).await.expect("create topics");
    }

    fn reply_headers(token: &str, status: &str) -> OwnedHeaders {
        OwnedHeaders::new()
            .insert(Header {
                key: CORRELATION_HEADER,
                value: Some(token),
            })
            .insert(Header {
                key: STATUS_HEADER,
                value: Some(status),
            })
    }

    #[tokio::test]
    #[ignore = "requires a Kafka broker on localhost:9092"]
    async fn correlated_reply_carries_downstream_body_and_status() {
        let config = GatewayConfig::default();
        let run = Uuid::new_v4();
        let in_topic = format!("gatemq-it-in-{run}");
        let out_topic = format!("gatemq-it-out-{run}");
        provision(&config, &[spec(&in_topic), spec(&out_topic)]).await;

        let token = Uuid::new_v4().to_string();
        let publisher = Publisher::connect(&config).expect("publisher");

        publisher
            .publish(
                &in_topic,
                None,
                b"{\"a\":1}",
                reply_headers(&token, "200"),
            )
            .await
            .expect("publish request");

        // Downstream writer: echo the token back with a 201.
        publisher
            .publish(
                &out_topic,
                None,
                b"{\"b\":2}",
                reply_headers(&token, "201"),
            )
            .await
            .expect("publish reply");

        let deadline = Instant::now() + Duration::from_secs(15);
        let outcome = correlation::await_correlated(&config, &token, &out_topic, None, deadline)
            .await
            .expect("correlation");

        assert_eq!(
            outcome,
            MatchOutcome::Success {
                body: b"{\"b\":2}".to_vec(),
                status: 201,
            }
        );
    }

    #[tokio::test]
    #[ignore = "requires a Kafka broker on localhost:9092"]
    async fn failure_topic_match_is_never_a_success() {
        let config = GatewayConfig::default();
        let run = Uuid::new_v4();
        let out_topic = format!("gatemq-it-out-{run}");
        let err_topic = format!("gatemq-it-err-{run}");
        provision(&config, &[spec(&out_topic), spec(&err_topic)]).await;

        let token = Uuid::new_v4().to_string();
        let publisher = Publisher::connect(&config).expect("publisher");

        // The pipeline reports a nominally-successful status on the
        // failure topic; the gateway must still answer with an error.
        publisher
            .publish(&err_topic, None, b"{\"detail\":\"boom\"}", reply_headers(&token, "200"))
            .await
            .expect("publish failure reply");

        let deadline = Instant::now() + Duration::from_secs(15);
        let outcome = correlation::await_correlated(
            &config,
            &token,
            &out_topic,
            Some(&err_topic),
            deadline,
        )
        .await
        .expect("correlation");

        assert_eq!(
            outcome,
            MatchOutcome::Failure {
                body: b"{\"detail\":\"boom\"}".to_vec(),
                status: 400,
            }
        );
    }

    #[tokio::test]
    #[ignore = "requires a Kafka broker on localhost:9092"]
    async fn silence_times_out_within_deadline_plus_one_poll() {
        let config = GatewayConfig {
            request_timeout_secs: 4,
            ..Default::default()
        };
        let run = Uuid::new_v4();
        let out_topic = format!("gatemq-it-out-{run}");
        provision(&config, &[spec(&out_topic)]).await;

        let started = Instant::now();
        let deadline = started + config.request_timeout();
        let outcome = correlation::await_correlated(
            &config,
            &Uuid::new_v4().to_string(),
            &out_topic,
            None,
            deadline,
        )
        .await
        .expect("correlation");

        assert_eq!(outcome, MatchOutcome::TimedOut);
        assert!(started.elapsed() < config.request_timeout() + config.poll_idle() + Duration::from_secs(1));
    }

    #[tokio::test]
    #[ignore = "requires a Kafka broker on localhost:9092"]
    async fn draining_an_empty_topic_yields_zero_messages() {
        let config = GatewayConfig::default();
        let topic = format!("gatemq-it-empty-{}", Uuid::new_v4());
        provision(&config, &[spec(&topic)]).await;

        let messages: Vec<ConsumedMessage> =
            gatemq::consumer::drain_topic(&config, &topic, Duration::from_secs(2))
                .await
                .expect("drain");
        assert!(messages.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires a Kafka broker on localhost:9092"]
    async fn create_then_exists_then_duplicate_create_fails() {
        let config = GatewayConfig::default();
        let topic = format!("gatemq-it-create-{}", Uuid::new_v4());
        let catalog = TopicCatalog::connect(&config).expect("catalog");

        catalog.create_topic(&spec(&topic)).await.expect("create");
        assert!(catalog.topic_exists(&topic).expect("exists"));

        let duplicate = catalog.create_topic(&spec(&topic)).await;
        assert!(matches!(
            duplicate,
            Err(gatemq::GatemqError::TopicExists(_))
        ));
    }
}

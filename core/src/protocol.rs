//! Wire-level constants and message shapes
//!
//! Header names are fixed contract with the downstream pipeline and must
//! be carried verbatim: the correlation token rides in `kafka_key` and the
//! pipeline reports its outcome in `invokehttp.status.code`.

use axum::http::HeaderMap;
use rdkafka::message::{Header, OwnedHeaders};
use serde_json::{json, Value};

/// Header carrying the per-request correlation token
pub const CORRELATION_HEADER: &str = "kafka_key";

/// Header carrying the downstream status code on reply messages
pub const STATUS_HEADER: &str = "invokehttp.status.code";

/// Status assumed when a reply carries no parsable status header
pub const DEFAULT_STATUS: u16 = 200;

/// Pipeline feature-flag headers, echoed verbatim onto the outbound message
pub const FLAG_RESOLVE_TERMINOLOGY: &str = "ResolveTerminology";
pub const FLAG_DEIDENTIFY_DATA: &str = "DeidentifyData";
pub const FLAG_RUN_ASCVD: &str = "RunASCVD";
pub const FLAG_ADD_NLP_INSIGHTS: &str = "AddNLPInsights";

/// Optional resource identifier header, attached only when non-empty
pub const RESOURCE_ID_HEADER: &str = "ResourceId";

/// Caller-supplied pipeline directives for one publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineFlags {
    pub resolve_terminology: String,
    pub deidentify_data: String,
    pub run_ascvd: String,
    pub add_nlp_insights: String,
    pub resource_id: Option<String>,
}

impl PipelineFlags {
    /// Extract the flag headers from an HTTP request, defaulting to "false"
    pub fn from_http(headers: &HeaderMap) -> Self {
        let flag = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("false")
                .to_string()
        };

        let resource_id = headers
            .get(RESOURCE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Self {
            resolve_terminology: flag(FLAG_RESOLVE_TERMINOLOGY),
            deidentify_data: flag(FLAG_DEIDENTIFY_DATA),
            run_ascvd: flag(FLAG_RUN_ASCVD),
            add_nlp_insights: flag(FLAG_ADD_NLP_INSIGHTS),
            resource_id,
        }
    }

    /// The headers as (name, value) pairs, in emission order
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            (FLAG_RESOLVE_TERMINOLOGY, self.resolve_terminology.as_str()),
            (FLAG_DEIDENTIFY_DATA, self.deidentify_data.as_str()),
            (FLAG_RUN_ASCVD, self.run_ascvd.as_str()),
            (FLAG_ADD_NLP_INSIGHTS, self.add_nlp_insights.as_str()),
        ];
        if let Some(resource_id) = &self.resource_id {
            pairs.push((RESOURCE_ID_HEADER, resource_id.as_str()));
        }
        pairs
    }

    /// Build the outbound Kafka header set
    ///
    /// The correlation token, when present, must be attached before the
    /// send: a reply can only be matched if the token rode out with the
    /// request.
    pub fn to_kafka_headers(&self, token: Option<&str>) -> OwnedHeaders {
        let mut headers = OwnedHeaders::new();
        for (key, value) in self.pairs() {
            headers = headers.insert(Header {
                key,
                value: Some(value),
            });
        }
        if let Some(token) = token {
            headers = headers.insert(Header {
                key: CORRELATION_HEADER,
                value: Some(token),
            });
        }
        headers
    }

    /// JSON rendering of the headers for acknowledgement echoes
    pub fn render(&self) -> Value {
        Value::Object(
            self.pairs()
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect(),
        )
    }
}

/// Render a payload as JSON when it parses, else as its lossy text
///
/// A parse failure is absorbed, never surfaced as an error.
pub fn render_body(payload: &[u8]) -> Value {
    serde_json::from_slice(payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()))
}

/// Truncated-body preview echoed on acknowledgements and timeouts
///
/// The declared length is the payload's byte length, regardless of how
/// many characters survive truncation.
pub fn preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    let head: String = text.chars().take(25).collect();
    format!("{}... {} bytes", head, payload.len())
}

/// Acknowledgement echo body shared by async publishes and timeouts
pub fn ack_echo(topic: &str, flags: &PipelineFlags, payload: &[u8]) -> Value {
    json!({
        "topic": topic,
        "headers": flags.render(),
        "data": preview(payload),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn flags_default_to_false_and_skip_empty_resource_id() {
        let headers = HeaderMap::new();
        let flags = PipelineFlags::from_http(&headers);

        assert_eq!(flags.resolve_terminology, "false");
        assert_eq!(flags.add_nlp_insights, "false");
        assert_eq!(flags.resource_id, None);
        assert_eq!(flags.pairs().len(), 4);
    }

    #[test]
    fn flags_echo_supplied_values_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(FLAG_DEIDENTIFY_DATA, HeaderValue::from_static("true"));
        headers.insert(RESOURCE_ID_HEADER, HeaderValue::from_static("Patient/42"));

        let flags = PipelineFlags::from_http(&headers);
        assert_eq!(flags.deidentify_data, "true");
        assert_eq!(flags.resource_id.as_deref(), Some("Patient/42"));

        let pairs = flags.pairs();
        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[4], (RESOURCE_ID_HEADER, "Patient/42"));
    }

    #[test]
    fn render_body_parses_json_and_falls_back_to_text() {
        assert_eq!(render_body(b"{\"a\":1}"), serde_json::json!({"a": 1}));
        assert_eq!(
            render_body(b"not json"),
            Value::String("not json".to_string())
        );
    }

    #[test]
    fn preview_declares_byte_length() {
        let payload = "x".repeat(100);
        let rendered = preview(payload.as_bytes());
        assert!(rendered.starts_with(&"x".repeat(25)));
        assert!(rendered.ends_with("... 100 bytes"));

        assert_eq!(preview(b"hi"), "hi... 2 bytes");
    }
}

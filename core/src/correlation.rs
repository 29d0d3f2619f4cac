//! Token-correlated reply matching
//!
//! The core of the synchronous publish path: scan one or two reply topics
//! from the earliest retained offset for a message whose `kafka_key`
//! header is byte-equal to the request's token, within one shared
//! wall-clock deadline.

use crate::config::GatewayConfig;
use crate::consumer::ScanSession;
use crate::protocol::{CORRELATION_HEADER, DEFAULT_STATUS, STATUS_HEADER};
use crate::Result;
use rdkafka::message::{Headers, Message};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Outcome of one correlation wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The token appeared on the reply topic
    Success { body: Vec<u8>, status: u16 },
    /// The token appeared on the failure topic; status already forced
    Failure { body: Vec<u8>, status: u16 },
    /// Neither topic yielded the token before the deadline
    TimedOut,
}

/// What one header scan learned about a candidate reply
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct HeaderScan {
    pub token_match: bool,
    pub status: u16,
}

/// Inspect a message's header pairs for the token and status
///
/// First match wins for both headers: duplicate names are not expected,
/// but if present only the first occurrence is honored. A missing or
/// unparsable status header falls back to 200.
pub(crate) fn inspect_headers<'a, I>(pairs: I, token: &str) -> HeaderScan
where
    I: IntoIterator<Item = (&'a str, Option<&'a [u8]>)>,
{
    let mut token_match = None;
    let mut status = None;

    for (key, value) in pairs {
        if key == CORRELATION_HEADER && token_match.is_none() {
            token_match = Some(value == Some(token.as_bytes()));
        } else if key == STATUS_HEADER && status.is_none() {
            status = value
                .and_then(|v| std::str::from_utf8(v).ok())
                .and_then(|v| v.trim().parse::<u16>().ok());
        }
    }

    HeaderScan {
        token_match: token_match.unwrap_or(false),
        status: status.unwrap_or(DEFAULT_STATUS),
    }
}

/// Force a failure-topic status into the error range
///
/// A match on the failure topic is never reported as success: a 2xx
/// embedded status becomes 400, anything else passes through.
pub(crate) fn force_error_status(status: u16) -> u16 {
    if (200..300).contains(&status) {
        400
    } else {
        status
    }
}

/// One drain pass over a session: first token match wins
///
/// Bounded by both the per-poll idle timeout and the overall deadline, so
/// a topic under continuous non-matching write cannot stall the outer
/// deadline check.
async fn scan_for(
    session: &ScanSession,
    token: &str,
    idle: Duration,
    deadline: Instant,
) -> Result<Option<(Vec<u8>, u16)>> {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        let wait = idle.min(deadline - now);

        let Some(message) = session.next_message(wait).await? else {
            return Ok(None);
        };

        let scan = match message.headers() {
            Some(headers) => inspect_headers(
                headers.iter().map(|header| (header.key, header.value)),
                token,
            ),
            None => continue,
        };

        if scan.token_match {
            debug!(
                topic = session.topic(),
                offset = message.offset(),
                status = scan.status,
                "correlated reply matched"
            );
            let body = message.payload().map(<[u8]>::to_vec).unwrap_or_default();
            return Ok(Some((body, scan.status)));
        }
    }
}

/// Wait for the reply bearing `token` on `reply_topic`, or on
/// `failure_topic` when one is configured, until `deadline`
///
/// Both topics share the single deadline; the caller's worst-case latency
/// is one configured value no matter how many reply channels are polled.
#[instrument(skip(config, deadline))]
pub async fn await_correlated(
    config: &GatewayConfig,
    token: &str,
    reply_topic: &str,
    failure_topic: Option<&str>,
    deadline: Instant,
) -> Result<MatchOutcome> {
    let reply = ScanSession::open(config, reply_topic)?;
    let failure = failure_topic
        .map(|topic| ScanSession::open(config, topic))
        .transpose()?;

    let idle = config.poll_idle();

    while Instant::now() < deadline {
        if let Some((body, status)) = scan_for(&reply, token, idle, deadline).await? {
            return Ok(MatchOutcome::Success { body, status });
        }

        if let Some(failure_session) = &failure {
            if let Some((body, status)) = scan_for(failure_session, token, idle, deadline).await? {
                return Ok(MatchOutcome::Failure {
                    body,
                    status: force_error_status(status),
                });
            }
        }
    }

    debug!("correlation deadline elapsed");
    Ok(MatchOutcome::TimedOut)
}

//! Startup provisioning
//!
//! Runs once, before the HTTP facade binds its listener: wait for the
//! broker, create any missing configured topics in one batched admin
//! call, warm partition metadata, then touch the readiness sentinel.

use crate::admin::TopicCatalog;
use crate::config::{GatewayConfig, TopicSpec};
use crate::Result;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Fixed interval between broker connection attempts
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Minimum spacing between connection-failure log lines
const CONNECT_LOG_WINDOW: Duration = Duration::from_secs(10);

/// Rate limiter for repeated log lines
///
/// Retrying and logging are decoupled concerns: the retry loop runs at its
/// own fixed interval while this throttle decides which failures are worth
/// a log line, so a prolonged outage cannot flood the log.
#[derive(Debug)]
pub struct LogThrottle {
    window: Duration,
    last: Option<Instant>,
}

impl LogThrottle {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// True when enough time has passed since the last accepted line
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// The configured topics not yet present on the broker
pub(crate) fn missing_topics(
    configured: &[TopicSpec],
    existing: &BTreeSet<String>,
) -> Vec<TopicSpec> {
    configured
        .iter()
        .filter(|spec| !existing.contains(&spec.name))
        .cloned()
        .collect()
}

/// Block until the broker answers a metadata request
///
/// Retries indefinitely at a fixed short interval; anything else wrong at
/// this stage is indistinguishable from the broker still coming up.
async fn wait_for_broker(config: &GatewayConfig) {
    let mut throttle = LogThrottle::new(CONNECT_LOG_WINDOW);
    info!(
        bootstrap_servers = %config.bootstrap_servers,
        "waiting for broker"
    );

    loop {
        match TopicCatalog::connect(config).and_then(|catalog| catalog.list_topics()) {
            Ok(_) => return,
            Err(err) => {
                if throttle.ready() {
                    error!(error = %err, "unable to connect to broker, retrying");
                }
                tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
            }
        }
    }
}

/// Provision the gateway: broker wait, topic creation, warmup, readiness
///
/// Connection failures are retried forever; an administrative error while
/// creating topics is fatal and aborts startup.
pub async fn run(config: &GatewayConfig) -> Result<()> {
    wait_for_broker(config).await;
    info!("broker reachable");

    let catalog = TopicCatalog::connect(config)?;
    let existing = catalog.list_topics()?;
    let missing = missing_topics(&config.initial_topics(), &existing);

    if !missing.is_empty() {
        info!(count = missing.len(), "creating missing topics");
        catalog.create_topics(&missing).await?;
    }

    // Readiness-only warmup: resolve partition metadata for every topic once.
    for topic in catalog.list_topics()? {
        let partitions = catalog.partition_count(&topic)?;
        info!(topic = %topic, partitions, "topic metadata loaded");
    }

    signal_ready(config.ready_file.as_ref())?;
    info!(ready_file = %config.ready_file, "bootstrap complete, readiness signaled");

    Ok(())
}

/// Touch the sentinel the readiness probe watches
pub(crate) fn signal_ready(path: &std::path::Path) -> Result<()> {
    std::fs::write(path, [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> TopicSpec {
        TopicSpec {
            name: name.to_string(),
            partitions: 1,
            replication: 1,
        }
    }

    #[test]
    fn missing_topics_is_the_set_difference() {
        let configured = vec![spec("in"), spec("out"), spec("err")];
        let existing: BTreeSet<String> =
            ["out".to_string(), "unrelated".to_string()].into_iter().collect();

        let missing = missing_topics(&configured, &existing);
        assert_eq!(
            missing.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["in", "err"]
        );
    }

    #[test]
    fn missing_topics_empty_when_everything_exists() {
        let configured = vec![spec("in")];
        let existing: BTreeSet<String> = ["in".to_string()].into_iter().collect();
        assert!(missing_topics(&configured, &existing).is_empty());
    }

    #[test]
    fn throttle_accepts_first_and_suppresses_inside_window() {
        let mut throttle = LogThrottle::new(Duration::from_millis(40));
        assert!(throttle.ready());
        assert!(!throttle.ready());

        std::thread::sleep(Duration::from_millis(50));
        assert!(throttle.ready());
        assert!(!throttle.ready());
    }

    #[test]
    fn readiness_sentinel_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ready");

        signal_ready(&path).expect("touch sentinel");
        assert!(path.exists());

        // Idempotent across restarts.
        signal_ready(&path).expect("re-touch sentinel");
    }
}

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

use crate::modules::monitor::model::{Monitor, ProbeKind, Verdict};

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = "Pulsewatch-Monitor/1.0";

/// Outcome of one probe. Failures are folded into a `Down` verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub verdict: Verdict,
    pub latency_ms: u32,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn up(latency_ms: u32, status_code: u16) -> Self {
        Self {
            verdict: Verdict::Up,
            latency_ms,
            status_code: Some(status_code),
            error: None,
        }
    }

    pub fn down(status_code: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Down,
            latency_ms: 0,
            status_code,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, monitor: &Monitor) -> ProbeResult;
}

/// `[200, 400)` counts as reachable
pub fn classify_status(status_code: u16) -> Verdict {
    if (200..400).contains(&status_code) {
        Verdict::Up
    } else {
        Verdict::Down
    }
}

/// HTTP GET health check with a fixed timeout and user agent
pub struct HealthCheckExecutor {
    client: Client,
}

impl HealthCheckExecutor {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    async fn probe_http(&self, url: &str) -> ProbeResult {
        let start = Instant::now();

        let mut response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return ProbeResult::down(None, "Request timeout"),
            Err(e) => return ProbeResult::down(None, e.to_string()),
        };

        let status_code = response.status().as_u16();

        // Latency covers the full body, which the client timeout also bounds.
        // Chunks are dropped as they arrive.
        loop {
            match response.chunk().await {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    return ProbeResult::down(Some(status_code), format!("Failed to read body: {}", e))
                }
            }
        }

        let latency_ms = u32::try_from(start.elapsed().as_millis()).unwrap_or(u32::MAX);

        match classify_status(status_code) {
            Verdict::Up => ProbeResult::up(latency_ms, status_code),
            Verdict::Down => ProbeResult::down(
                Some(status_code),
                format!("Unexpected status {}", status_code),
            ),
        }
    }
}

impl Default for HealthCheckExecutor {
    fn default() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS))
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

#[async_trait]
impl Prober for HealthCheckExecutor {
    async fn probe(&self, monitor: &Monitor) -> ProbeResult {
        match monitor.kind {
            ProbeKind::Http => self.probe_http(&monitor.url).await,
        }
    }
}

use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Tunables of the dispatch and health engine. Every field has a production
/// default, so a missing config file means "run with defaults"; tests shrink
/// the timers through the same struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub listen_addr: String,

    /// health probe period
    pub probe_interval_ms: u64,
    /// per-probe deadline
    pub probe_timeout_ms: u64,

    /// client-side deadline on forwarded calls, 0 = unbounded
    pub upstream_timeout_ms: u64,

    /// samples above this are counted as slow
    pub expected_latency_ms: u64,
    /// how long an UNHEALTHY backend sits out of rotation
    pub recover_cooldown_ms: u64,

    pub request_error_threshold: u32,
    pub healthcheck_error_threshold: u32,
    pub slow_request_threshold: u32,

    /// false collapses the two-tier weighting into plain round robin
    pub weighted: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            listen_addr: "0.0.0.0:8888".to_string(),
            probe_interval_ms: 5_000,
            probe_timeout_ms: 5_000,
            upstream_timeout_ms: 0,
            expected_latency_ms: 100,
            recover_cooldown_ms: 30_000,
            request_error_threshold: 2,
            healthcheck_error_threshold: 2,
            slow_request_threshold: 2,
            weighted: true,
        }
    }
}

impl ProxyConfig {
    pub async fn from_file(path: &str) -> crate::Result<Self> {
        let mut file = File::open(path).await?;
        let mut content = String::new();
        file.read_to_string(&mut content).await?;
        ProxyConfig::from_content(&content)
    }

    pub fn from_content(content: &str) -> crate::Result<Self> {
        let config: ProxyConfig = toml::from_str(content)?;
        Ok(config)
    }
}

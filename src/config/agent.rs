// Agent configuration, read from the environment.

use std::time::Duration;

pub const DEFAULT_MONITORING_CENTER_URL: &str = "http://localhost:8080";
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Shorter configured intervals are raised to this, not rejected.
pub const MIN_POLLING_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub monitoring_center_url: String,
    pub host_id: String,
    pub polling_interval: Duration,
    pub request_timeout: Duration,
}

impl AgentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup (e.g. a map in tests).
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host_id = get("HOST_ID")
            .map(|v| v.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("HOST_ID environment variable is required"))?;

        let monitoring_center_url = get("MONITORING_CENTER_URL")
            .unwrap_or_else(|| DEFAULT_MONITORING_CENTER_URL.into())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let polling_interval = match get("POLLING_INTERVAL") {
            Some(v) => parse_duration("POLLING_INTERVAL", &v)?,
            None => DEFAULT_POLLING_INTERVAL,
        };
        let request_timeout = match get("REQUEST_TIMEOUT") {
            Some(v) => parse_duration("REQUEST_TIMEOUT", &v)?,
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        anyhow::ensure!(
            !request_timeout.is_zero(),
            "REQUEST_TIMEOUT must be > 0, got {:?}",
            request_timeout
        );
        anyhow::ensure!(
            monitoring_center_url.starts_with("http://")
                || monitoring_center_url.starts_with("https://"),
            "MONITORING_CENTER_URL must be an http(s) URL, got {}",
            monitoring_center_url
        );

        Ok(Self {
            monitoring_center_url,
            host_id,
            polling_interval: apply_interval_floor(polling_interval),
            request_timeout,
        })
    }
}

/// Raises `interval` to [`MIN_POLLING_INTERVAL`] when below it.
pub fn apply_interval_floor(interval: Duration) -> Duration {
    if interval < MIN_POLLING_INTERVAL {
        tracing::warn!(
            configured = ?interval,
            effective = ?MIN_POLLING_INTERVAL,
            "polling interval too low, raising to floor"
        );
        MIN_POLLING_INTERVAL
    } else {
        interval
    }
}

fn parse_duration(key: &str, value: &str) -> anyhow::Result<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| anyhow::anyhow!("{} must be a duration like 30s or 5m, got {:?}: {}", key, value, e))
}

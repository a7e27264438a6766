use std::env;
use std::time::Duration;

use anyhow::Result;

pub const DEFAULT_DAEMON_ADDR: &str = "127.0.0.1:5476";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub daemon_addr: String,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let daemon_addr = env::var("SERVICEDECK_DAEMON_ADDR")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DAEMON_ADDR.to_string());
        if !daemon_addr.contains(':') {
            anyhow::bail!("SERVICEDECK_DAEMON_ADDR must be host:port, got {daemon_addr}");
        }

        let refresh_interval =
            Duration::from_millis(env_u64("SERVICEDECK_REFRESH_MS", 1000).clamp(200, 5000));
        let request_timeout =
            Duration::from_millis(env_u64("SERVICEDECK_REQUEST_TIMEOUT_MS", 5000).max(100));

        Ok(Self {
            daemon_addr,
            refresh_interval,
            request_timeout,
        })
    }

    /// Refresh interval for the dashboard, with an optional command-line override.
    pub fn refresh_interval_or(&self, override_ms: Option<u64>) -> Duration {
        override_ms
            .map(|ms| Duration::from_millis(ms.clamp(200, 5000)))
            .unwrap_or(self.refresh_interval)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

use std::time::Duration;

use crate::session::ReconnectPolicy;

/// Client configuration parsed from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket endpoint of the game peer.
    pub server_url: String,
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
    /// Backoff applied when the connection drops.
    pub reconnect: ReconnectPolicy,
    /// Inbound event queue size.
    pub event_capacity: usize,
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = ClientConfig::default();
        ClientConfig {
            server_url: std::env::var("TTT_SERVER_URL").unwrap_or(defaults.server_url),
            connect_timeout: env_u64("TTT_CONNECT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            reconnect: ReconnectPolicy {
                max_attempts: std::env::var("TTT_RECONNECT_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.reconnect.max_attempts),
                base_delay: env_u64("TTT_RECONNECT_BASE_DELAY_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.reconnect.base_delay),
                max_delay: env_u64("TTT_RECONNECT_MAX_DELAY_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.reconnect.max_delay),
            },
            event_capacity: env_u64("TTT_EVENT_CAPACITY")
                .map(|v| (v as usize).max(1))
                .unwrap_or(defaults.event_capacity),
        }
    }

    /// Override the endpoint, e.g. from a `--url` argument.
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "ws://localhost:8080".to_string(),
            connect_timeout: Duration::from_millis(5000),
            reconnect: ReconnectPolicy::default(),
            event_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "ws://localhost:8080");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn from_env_defaults() {
        // Without setting env vars, should fall back to defaults
        let config = ClientConfig::from_env();
        assert_eq!(config.server_url, "ws://localhost:8080");
        assert_eq!(config.reconnect, ReconnectPolicy::default());
    }

    #[test]
    fn url_override() {
        let config = ClientConfig::default().with_server_url("ws://peer:9000/game");
        assert_eq!(config.server_url, "ws://peer:9000/game");
    }
}

use serde::Deserialize;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Environment variable prefix, e.g. `HUB_PORT=8000`
pub const ENV_PREFIX: &str = "HUB_";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Mailbox capacity for Server-Sent-Events subscribers
    #[serde(default = "default_sse_channel_capacity")]
    pub sse_channel_capacity: usize,
    /// Mailbox capacity for WebSocket subscribers
    #[serde(default = "default_ws_channel_capacity")]
    pub ws_channel_capacity: usize,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Reconnect advisory sent to EventSource clients
    #[serde(default = "default_sse_retry_ms")]
    pub sse_retry_ms: u64,
    /// Role that receives order-created events
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_sse_channel_capacity() -> usize {
    8
}

fn default_ws_channel_capacity() -> usize {
    256
}

fn default_heartbeat_interval_secs() -> u64 {
    25
}

fn default_sse_retry_ms() -> u64 {
    5000
}

fn default_admin_role() -> String {
    "admin".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            sse_channel_capacity: default_sse_channel_capacity(),
            ws_channel_capacity: default_ws_channel_capacity(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            sse_retry_ms: default_sse_retry_ms(),
            admin_role: default_admin_role(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from an explicit set of variables (unprefixed keys are ignored)
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sse_channel_capacity == 0 || self.ws_channel_capacity == 0 {
            return Err(AppError::Config(
                "channel capacities must be greater than zero".into(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(AppError::Config(
                "heartbeat interval must be greater than zero".into(),
            ));
        }
        if self.admin_role.is_empty() {
            return Err(AppError::Config("admin role must not be empty".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            sse_channel_capacity: self.sse_channel_capacity,
            ws_channel_capacity: self.ws_channel_capacity,
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            sse_retry: Duration::from_millis(self.sse_retry_ms),
        }
    }
}

/// Tunables shared by the streaming transports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub sse_channel_capacity: usize,
    pub ws_channel_capacity: usize,
    pub heartbeat_interval: Duration,
    pub sse_retry: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Config::default().stream_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = Config::from_vars(Vec::new()).unwrap();
        let settings = config.stream_settings();

        assert_eq!(config.port, 8000);
        assert_eq!(config.admin_role, "admin");
        assert_eq!(settings.sse_channel_capacity, 8);
        assert_eq!(settings.ws_channel_capacity, 256);
        assert_eq!(settings.heartbeat_interval, Duration::from_secs(25));
        assert_eq!(settings.sse_retry, Duration::from_millis(5000));
    }

    #[test]
    fn test_prefixed_overrides() {
        let config = Config::from_vars(vars(&[
            ("HUB_PORT", "9100"),
            ("HUB_SSE_CHANNEL_CAPACITY", "16"),
            ("HUB_ADMIN_ROLE", "ops"),
            ("PORT", "1"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.sse_channel_capacity, 16);
        assert_eq!(config.admin_role, "ops");
        assert_eq!(config.bind_addr(), "0.0.0.0:9100");
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = Config::from_vars(vars(&[("HUB_WS_CHANNEL_CAPACITY", "0")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_rejects_unparseable_value() {
        let err = Config::from_vars(vars(&[("HUB_PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Exponential backoff settings for re-opening a dropped push channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay.
    pub max_delay_ms: u64,
    /// Attempts allowed before the consumer gives up.
    pub max_attempts: u32,
    /// A connected channel that delivers no frame for this long is treated as dead.
    pub idle_timeout_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: 5,
            idle_timeout_ms: 30_000,
        }
    }
}

impl ReconnectConfig {
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// Settings for the reconnecting stream consumer and the CLI.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the Beacon server.
    pub server_url: Url,
    /// Principal to act as. Identity is resolved upstream; the client only forwards it.
    pub principal_id: Option<Uuid>,
    /// How many recent notifications to request in the connect-time snapshot.
    pub snapshot_limit: usize,
    /// Maximum entries kept in the local notification window.
    pub cache_capacity: usize,
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            principal_id: None,
            snapshot_limit: 20,
            cache_capacity: 50,
            reconnect: ReconnectConfig::default(),
        }
    }
}

fn default_server_url() -> Url {
    Url::parse("http://localhost:8080").expect("static default URL is valid")
}

impl ClientConfig {
    pub(crate) fn validate(&self, errors: &mut Vec<String>) {
        if self.cache_capacity == 0 {
            errors.push("client.cache_capacity must be greater than 0".to_string());
        }
        if self.snapshot_limit == 0 {
            errors.push("client.snapshot_limit must be greater than 0".to_string());
        }
        if self.reconnect.base_delay_ms == 0 {
            errors.push("client.reconnect.base_delay_ms must be greater than 0".to_string());
        }
        if self.reconnect.max_delay_ms < self.reconnect.base_delay_ms {
            errors.push(
                "client.reconnect.max_delay_ms must not be smaller than base_delay_ms".to_string(),
            );
        }
        if self.reconnect.idle_timeout_ms == 0 {
            errors.push("client.reconnect.idle_timeout_ms must be greater than 0".to_string());
        }
    }
}

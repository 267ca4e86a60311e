use crate::config::{
    default_auth_mode, default_bind_address, default_heartbeat_timeout_secs,
    default_liveness_interval_ms, default_max_attempts, default_port,
};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the listening socket binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// First port tried.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of consecutive ports tried, starting at `port`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u16,
    /// Ask on the console before accepting each connection.
    #[serde(default = "default_auth_mode")]
    pub auth_mode: bool,
    /// Seconds of heartbeat silence before a session is evicted.
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
    /// How often the liveness monitor checks sessions.
    #[serde(default = "default_liveness_interval_ms")]
    pub liveness_interval_ms: u64,
}

impl ServerConfig {
    pub(crate) fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub(crate) fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms.max(1))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_attempts: default_max_attempts(),
            auth_mode: default_auth_mode(),
            heartbeat_timeout_secs: default_heartbeat_timeout_secs(),
            liveness_interval_ms: default_liveness_interval_ms(),
        }
    }
}

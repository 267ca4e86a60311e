#[allow(clippy::module_inception)]
mod config;
mod server_config;
mod storage_config;

pub(crate) use {config::Config, server_config::ServerConfig, storage_config::StorageConfig};

use std::path::PathBuf;

use directories::ProjectDirs;

pub(crate) const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub(crate) const DEFAULT_PORT: u16 = 5908;
pub(crate) const DEFAULT_MAX_ATTEMPTS: u16 = 3;
pub(crate) const DEFAULT_AUTH_MODE: bool = false;
pub(crate) const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 15;
pub(crate) const DEFAULT_LIVENESS_INTERVAL_MS: u64 = 1000;

/// Environment variable naming an alternate config file.
pub(crate) const CONFIG_PATH_ENV: &str = "MACRO_RELAY_CONFIG";

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "macro-relay", "Macro-Relay")
}

pub(crate) fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

pub(crate) fn default_port() -> u16 {
    DEFAULT_PORT
}

pub(crate) fn default_max_attempts() -> u16 {
    DEFAULT_MAX_ATTEMPTS
}

pub(crate) fn default_auth_mode() -> bool {
    DEFAULT_AUTH_MODE
}

pub(crate) fn default_heartbeat_timeout_secs() -> u64 {
    DEFAULT_HEARTBEAT_TIMEOUT_SECS
}

pub(crate) fn default_liveness_interval_ms() -> u64 {
    DEFAULT_LIVENESS_INTERVAL_MS
}

pub(crate) fn default_macros_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("macros"))
        .unwrap_or_else(|| PathBuf::from("macros"))
}

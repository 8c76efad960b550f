// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration management.
//!
//! Configuration is stored in `morsel.toml` inside the state directory (or
//! wherever `--config` / `MORSEL_CONFIG` points) and includes:
//! - `backend_url`: WebSocket endpoint that receives replayed actions
//! - `probe_url`: Optional separate endpoint for reachability probes
//! - `[probe]`, `[replay]`, `[notify]`, `[queue]`, `[link]` tuning sections
//!
//! Every field has a default, so an absent file is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use morsel_core::ReplayPolicy;

use crate::env;

pub const CONFIG_FILE_NAME: &str = "morsel.toml";
pub const QUEUE_FILE_NAME: &str = "pending.jsonl";
pub const LOG_FILE_NAME: &str = "agent.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid {field} '{url}': must start with {expected}")]
    InvalidUrl {
        field: &'static str,
        url: String,
        expected: &'static str,
    },

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket URL of the backend (default: "ws://127.0.0.1:7890").
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Probe endpoint. `ws://`, `wss://` or `tcp://host:port`. Defaults to
    /// `backend_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub link: LinkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Probe interval while the backend is not known reachable (default: 5000).
    #[serde(default = "default_probe_interval_ms")]
    pub interval_ms: u64,
    /// Probe interval once reachable (default: 60000).
    #[serde(default = "default_steady_interval_ms")]
    pub steady_interval_ms: u64,
    /// A probe exceeding this is recorded as indeterminate (default: 3000).
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Transient failures tolerated before an action is abandoned (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// A handler exceeding this is treated as a connectivity failure
    /// (default: 15000).
    #[serde(default = "default_replay_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Minimum gap between two "degraded" messages (default: 30000).
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue file. Relative paths resolve against the state directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Log a warning once the queue reaches this length (default: 500).
    #[serde(default = "default_warn_len")]
    pub warn_len: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Poll `/sys/class/net/*/operstate`.
    #[default]
    Sysfs,
    /// Assume a link is always present; rely on probes alone.
    AlwaysUp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub source: LinkKind,
    /// Only consider this interface (default: any non-loopback interface).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(default = "default_link_poll_ms")]
    pub poll_interval_ms: u64,
}

fn default_backend_url() -> String {
    "ws://127.0.0.1:7890".to_string()
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

fn default_steady_interval_ms() -> u64 {
    60_000
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_replay_timeout_ms() -> u64 {
    15_000
}

fn default_cooldown_ms() -> u64 {
    30_000
}

fn default_warn_len() -> usize {
    500
}

fn default_link_poll_ms() -> u64 {
    1_000
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_url: default_backend_url(),
            probe_url: None,
            probe: ProbeConfig::default(),
            replay: ReplayConfig::default(),
            notify: NotifyConfig::default(),
            queue: QueueConfig::default(),
            link: LinkConfig::default(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            interval_ms: default_probe_interval_ms(),
            steady_interval_ms: default_steady_interval_ms(),
            timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_ms: default_replay_timeout_ms(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig { cooldown_ms: default_cooldown_ms() }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig { path: None, warn_len: default_warn_len() }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            source: LinkKind::default(),
            interface: None,
            poll_interval_ms: default_link_poll_ms(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Self::load(path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_ws_url(&self.backend_url) {
            return Err(ConfigError::InvalidUrl {
                field: "backend_url",
                url: self.backend_url.clone(),
                expected: "ws:// or wss://",
            });
        }
        if let Some(url) = &self.probe_url {
            if !is_ws_url(url) && !url.starts_with("tcp://") {
                return Err(ConfigError::InvalidUrl {
                    field: "probe_url",
                    url: url.clone(),
                    expected: "ws://, wss:// or tcp://",
                });
            }
        }
        if self.replay.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "replay.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.probe.interval_ms == 0 || self.probe.steady_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probe.interval_ms",
                reason: "probe intervals must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// The endpoint probed for reachability.
    pub fn probe_target(&self) -> &str {
        self.probe_url.as_deref().unwrap_or(&self.backend_url)
    }

    /// Where the durable queue lives for a given state directory.
    pub fn queue_path(&self, state_dir: &Path) -> PathBuf {
        match &self.queue.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => state_dir.join(path),
            None => state_dir.join(QUEUE_FILE_NAME),
        }
    }

    pub fn replay_policy(&self) -> ReplayPolicy {
        ReplayPolicy {
            max_attempts: self.replay.max_attempts,
            initial_backoff: Duration::from_millis(self.replay.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.replay.max_backoff_ms),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: CONFIG_FILE_NAME.to_string(),
            message: e.to_string(),
        })
    }
}

fn is_ws_url(url: &str) -> bool {
    url.starts_with("ws://") || url.starts_with("wss://")
}

/// Resolves the agent state directory.
///
/// Order: explicit override, `MORSEL_STATE_DIR`, `$XDG_STATE_HOME/morsel`,
/// `~/.local/state/morsel`.
pub fn resolve_state_dir(explicit: Option<&Path>) -> PathBuf {
    pick_state_dir(explicit, env::state_dir(), env::xdg_state_home(), dirs::home_dir())
}

fn pick_state_dir(
    explicit: Option<&Path>,
    state_env: Option<PathBuf>,
    xdg: Option<PathBuf>,
    home: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = state_env {
        return dir;
    }
    if let Some(dir) = xdg {
        return dir.join("morsel");
    }
    home.map(|h| h.join(".local/state/morsel"))
        .unwrap_or_else(|| PathBuf::from(".local/state/morsel"))
}

/// Resolves the config file: explicit override, `MORSEL_CONFIG`, then
/// `morsel.toml` in the state directory.
pub fn resolve_config_path(explicit: Option<&Path>, state_dir: &Path) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(env::config_path)
        .unwrap_or_else(|| state_dir.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration management.
//!
//! Configuration is stored in `config.toml` inside the state directory and
//! includes:
//! - `store_id`: default store for clock events
//! - `[session]`: employee identity and credential
//! - `[remote]`: the synchronization endpoint
//! - `[agent]`: probe, sync, cleanup and escalation settings
//!
//! The state directory also holds the queue database, the agent lock and the
//! agent log.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tk_core::SessionContext;

use crate::env;
use crate::error::{Error, Result};
use crate::sync::SyncConfig;

const STATE_DIR_NAME: &str = "tock";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "clock.db";
const LOCK_FILE_NAME: &str = "agent.lock";
const LOG_FILE_NAME: &str = "agent.log";

/// Client configuration stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Store used when a capture does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    #[serde(default)]
    pub session: SessionContext,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Remote synchronization endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL (`ws://...` or `wss://...`).
    #[serde(default = "default_remote_url")]
    pub url: String,
    /// Max time to establish the connection in seconds (default: 5).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Max time to wait for a sync response in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            url: default_remote_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    /// Returns an error unless the URL is a WebSocket URL.
    pub fn validate_url(&self) -> Result<()> {
        if self.url.starts_with("ws://") || self.url.starts_with("wss://") {
            Ok(())
        } else {
            Err(Error::InvalidRemoteUrl(self.url.clone()))
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Client settings for this endpoint.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            url: self.url.clone(),
            connect_timeout: self.connect_timeout(),
            request_timeout: self.request_timeout(),
        }
    }
}

/// Settings for the long-running sync agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// `host:port` probed for connectivity. Derived from the remote URL when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_target: Option<String>,
    /// Seconds between connectivity probes (default: 15).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    /// Seconds between timer-driven sync passes (default: 300).
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Upper bound for the timer delay after failed passes (default: 1800).
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// Seconds between cleanup runs (default: 3600).
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Days a confirmed record is kept before purge (default: 7).
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Failed attempts after which a record is reported as stalled (default: 5).
    #[serde(default = "default_escalate_after_attempts")]
    pub escalate_after_attempts: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            probe_target: None,
            probe_interval_secs: default_probe_interval_secs(),
            sync_interval_secs: default_sync_interval_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            retention_days: default_retention_days(),
            escalate_after_attempts: default_escalate_after_attempts(),
        }
    }
}

impl AgentConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs.max(self.sync_interval_secs).max(1))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

fn default_remote_url() -> String {
    "ws://localhost:7890".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_probe_interval_secs() -> u64 {
    15
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_max_backoff_secs() -> u64 {
    1800
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

/// Default retention window for confirmed records, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_escalate_after_attempts() -> u32 {
    5
}

impl Config {
    /// Returns true if a config file exists in `state_dir`.
    pub fn exists(state_dir: &Path) -> bool {
        config_path(state_dir).is_file()
    }

    /// Loads configuration from the given state directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if no config file exists.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = config_path(state_dir);
        if !path.is_file() {
            return Err(Error::NotInitialized);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Saves configuration to the given state directory, creating it if needed.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        fs::create_dir_all(state_dir)?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(config_path(state_dir), content)?;
        Ok(())
    }

    /// Session for capture and sync, with `TOCK_AUTH_TOKEN` overriding the
    /// stored credential.
    pub fn session(&self) -> SessionContext {
        let mut session = self.session.clone();
        if let Some(token) = env::auth_token() {
            session.auth_token = Some(token);
        }
        session
    }

    /// The `host:port` the connectivity probe should dial.
    pub fn probe_target(&self) -> Option<String> {
        self.agent
            .probe_target
            .clone()
            .or_else(|| probe_target_from_url(&self.remote.url))
    }
}

/// Derives `host:port` from a WebSocket URL, defaulting the port by scheme.
pub fn probe_target_from_url(url: &str) -> Option<String> {
    let (rest, default_port) = if let Some(rest) = url.strip_prefix("ws://") {
        (rest, 80)
    } else if let Some(rest) = url.strip_prefix("wss://") {
        (rest, 443)
    } else {
        return None;
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or_default();
    if authority.is_empty() {
        return None;
    }

    // Bracketed IPv6 literal, with or without a port.
    if authority.starts_with('[') {
        return match authority.rfind("]:") {
            Some(_) => Some(authority.to_string()),
            None => Some(format!("{authority}:{default_port}")),
        };
    }

    match authority.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Some(authority.to_string())
        }
        Some(_) => None,
        None => Some(format!("{authority}:{default_port}")),
    }
}

/// Resolves the state directory: `TOCK_STATE_DIR`, else
/// `$XDG_STATE_HOME/tock`, else `~/.local/state/tock`.
pub fn state_dir() -> PathBuf {
    if let Some(dir) = env::state_dir() {
        return dir;
    }
    if let Some(dir) = env::xdg_state_home() {
        return dir.join(STATE_DIR_NAME);
    }
    dirs::home_dir()
        .map(|h| h.join(".local/state").join(STATE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".local/state").join(STATE_DIR_NAME))
}

pub fn config_path(state_dir: &Path) -> PathBuf {
    state_dir.join(CONFIG_FILE_NAME)
}

pub fn db_path(state_dir: &Path) -> PathBuf {
    state_dir.join(DB_FILE_NAME)
}

pub fn lock_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOCK_FILE_NAME)
}

pub fn log_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOG_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

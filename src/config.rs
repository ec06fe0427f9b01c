//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::cache::{CachePolicy, DEFAULT_MAX_ENTRY_BYTES};
use crate::retention::{MessageRetention, RetentionConfig};

/// Default base URL of the remote REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v9";

/// Runtime configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// File backing the persisted key-value store
    pub store_path: PathBuf,
    /// HTTP port of the command surface
    pub server_port: u16,
    /// Base URL of the remote REST API
    pub api_base_url: String,
    /// Per-entry ceiling of the bounded cache in bytes
    pub cache_max_entry_bytes: usize,
    /// Messages a live session keeps in memory
    pub message_retention: MessageRetention,
    /// Interval in seconds between retention sweeps
    pub retention_sweep_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STORE_PATH` - Store file (default: chatdeck-store.json)
    /// - `SERVER_PORT` - HTTP port (default: 3790)
    /// - `API_BASE_URL` - Remote API base URL
    /// - `CACHE_MAX_ENTRY_MB` - Per-entry cache ceiling in MiB (default: 5)
    /// - `MESSAGE_RETENTION` - Retained messages (default: 50)
    /// - `MESSAGE_TTL_MINUTES` - When set, retain messages by age instead of count
    /// - `RETENTION_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let message_retention = match parse_var::<u64>("MESSAGE_TTL_MINUTES") {
            Some(minutes) => match minutes.checked_mul(60) {
                Some(secs) => MessageRetention::Ttl(Duration::from_secs(secs)),
                None => {
                    warn!("MESSAGE_TTL_MINUTES={} is out of range, using the default", minutes);
                    defaults.message_retention
                }
            },
            None => MessageRetention::LastN(
                parse_var("MESSAGE_RETENTION").unwrap_or(crate::retention::DEFAULT_MESSAGE_RETENTION),
            ),
        };

        let cache_max_entry_bytes = match parse_var::<usize>("CACHE_MAX_ENTRY_MB") {
            Some(mb) => mb.checked_mul(1024 * 1024).unwrap_or_else(|| {
                warn!("CACHE_MAX_ENTRY_MB={} is out of range, using the default", mb);
                defaults.cache_max_entry_bytes
            }),
            None => defaults.cache_max_entry_bytes,
        };

        Self {
            store_path: env::var("STORE_PATH")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            cache_max_entry_bytes,
            message_retention,
            retention_sweep_interval: parse_var("RETENTION_SWEEP_INTERVAL")
                .unwrap_or(defaults.retention_sweep_interval),
        }
    }

    /// Cache policy derived from this configuration.
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::default().with_max_entry_bytes(self.cache_max_entry_bytes)
    }

    /// Retention limits for sessions built from this configuration.
    pub fn retention(&self) -> RetentionConfig {
        RetentionConfig::default().with_messages(self.message_retention)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("chatdeck-store.json"),
            server_port: 3790,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cache_max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            message_retention: MessageRetention::LastN(crate::retention::DEFAULT_MESSAGE_RETENTION),
            retention_sweep_interval: 60,
        }
    }
}

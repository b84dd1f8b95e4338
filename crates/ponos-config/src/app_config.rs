//! Application configuration structures.

use crate::ScheduleRegistry;
use ponos_core::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration, one-to-one with `ponos.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PonosConfig {
    /// Name of the backend driver.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Redis connection settings.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Named schedule entries.
    #[serde(default)]
    pub schedule: ScheduleRegistry,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// How long a graceful stop waits for in-flight dispatches.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for PonosConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            redis: RedisConfig::default(),
            schedule: ScheduleRegistry::default(),
            logging: LoggingConfig::default(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl PonosConfig {
    /// Returns the shutdown grace period as Duration.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn default_driver() -> String {
    "sidekiq-activejob".to_string()
}

fn default_shutdown_grace() -> u64 {
    10
}

/// Redis connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL.
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Optional key namespace, as used by redis-namespace.
    #[serde(default)]
    pub namespace: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout(),
            namespace: None,
        }
    }
}

impl RedisConfig {
    /// Returns the connect timeout as Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_connect_timeout() -> u64 {
    5
}

//! Configuration loader.

use crate::{ConfigValidator, PonosConfig};
use ponos_core::{PonosError, PonosResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "./ponos.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "PONOS_CONFIG";

/// Loads `ponos.toml` and applies environment overrides.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Creates a loader for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a loader for `$PONOS_CONFIG`, falling back to `./ponos.toml`.
    ///
    /// A `.env` file in the working directory is read first, so the path and
    /// the overrides may also come from there.
    pub fn from_default_location() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::new(path)
    }

    /// Path of the configuration file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads, overrides and validates the configuration.
    ///
    /// Overrides:
    /// - `PONOS_DRIVER` replaces `driver`
    /// - `PONOS_REDIS_URL` replaces `redis.url`
    /// - `PONOS_LOG` replaces `logging.filter`
    pub fn load(&self) -> PonosResult<PonosConfig> {
        info!("Reading configuration from {}...", self.path.display());

        if !self.path.exists() {
            return Err(PonosError::Configuration(format!(
                "Cannot find {} in cwd. Stopping.",
                self.path.display()
            )));
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let mut config = Self::parse(&raw)?;
        Self::apply_overrides(&mut config, |key| std::env::var(key).ok());
        Self::validate(&config)?;

        Ok(config)
    }

    /// Parses configuration text.
    pub fn parse(raw: &str) -> PonosResult<PonosConfig> {
        toml::from_str(raw)
            .map_err(|e| PonosError::Configuration(format!("Error parsing configuration: {}", e)))
    }

    /// Applies `PONOS_*` overrides using the given variable lookup.
    pub fn apply_overrides(config: &mut PonosConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(driver) = lookup("PONOS_DRIVER") {
            debug!(driver = %driver, "Driver overridden from environment");
            config.driver = driver;
        }
        if let Some(url) = lookup("PONOS_REDIS_URL") {
            debug!("Redis URL overridden from environment");
            config.redis.url = url;
        }
        if let Some(filter) = lookup("PONOS_LOG") {
            config.logging.filter = filter;
        }
    }

    /// Validates the configuration, joining every problem into one error.
    fn validate(config: &PonosConfig) -> PonosResult<()> {
        if let Err(errors) = ConfigValidator::validate(config) {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PonosError::Configuration(message));
        }

        if config.schedule.is_empty() {
            warn!("Schedule is empty, nothing will be dispatched");
        }

        Ok(())
    }
}

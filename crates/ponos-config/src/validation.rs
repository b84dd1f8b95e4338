//! Configuration validation module.
//!
//! Validation collects every problem instead of stopping at the first one, so
//! an operator fixing `ponos.toml` sees the whole list in one run.

use crate::PonosConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// No driver name given.
    MissingDriver,
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Pool size must be at least one.
    InvalidPoolSize { value: usize },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Namespace must not be blank.
    BlankNamespace,
    /// A schedule entry has no trigger expression.
    MissingPeriod { entry: String },
    /// A schedule entry has no job name.
    MissingJobName { entry: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDriver => write!(f, "A driver name is required"),
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::InvalidPoolSize { value } => {
                write!(f, "Invalid pool size: {} (must be at least 1)", value)
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{}' must be positive, got {}", name, value)
            }
            Self::BlankNamespace => write!(f, "redis.namespace must not be blank"),
            Self::MissingPeriod { entry } => {
                write!(f, "Schedule entry '{}' has no period", entry)
            }
            Self::MissingJobName { entry } => {
                write!(f, "Schedule entry '{}' has no job", entry)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// URL schemes the Redis client understands.
    const REDIS_SCHEMES: &'static [&'static str] = &["redis", "rediss", "redis+unix", "unix"];

    /// Validates the entire configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &PonosConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        if config.driver.trim().is_empty() {
            errors.push(ConfigValidationError::MissingDriver);
        }

        Self::validate_redis(&config.redis, &mut errors);
        Self::validate_schedule(&config.schedule, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validates Redis configuration.
    fn validate_redis(config: &crate::RedisConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.url.is_empty() {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else {
            match Url::parse(&config.url) {
                Ok(url) if !Self::REDIS_SCHEMES.contains(&url.scheme()) => {
                    errors.push(ConfigValidationError::InvalidUrl {
                        url_type: "redis".to_string(),
                        message: format!("unsupported scheme '{}'", url.scheme()),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    errors.push(ConfigValidationError::InvalidUrl {
                        url_type: "redis".to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if config.pool_size == 0 {
            errors.push(ConfigValidationError::InvalidPoolSize {
                value: config.pool_size,
            });
        }

        if config.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "redis.connect_timeout_secs".to_string(),
                value: 0,
            });
        }

        if let Some(namespace) = &config.namespace {
            if namespace.trim().is_empty() {
                errors.push(ConfigValidationError::BlankNamespace);
            }
        }
    }

    /// Validates the schedule entries.
    ///
    /// Trigger expressions are only checked for presence here; their syntax
    /// is checked when the dispatcher registers them.
    fn validate_schedule(
        schedule: &crate::ScheduleRegistry,
        errors: &mut Vec<ConfigValidationError>,
    ) {
        for (name, item) in schedule {
            if item.period.trim().is_empty() {
                errors.push(ConfigValidationError::MissingPeriod {
                    entry: name.clone(),
                });
            }
            if item.job_name.trim().is_empty() {
                errors.push(ConfigValidationError::MissingJobName {
                    entry: name.clone(),
                });
            }
        }
    }
}

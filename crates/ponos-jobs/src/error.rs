//! Job error types.

use ponos_core::PonosError;
use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Job-related errors.
#[derive(Debug, Error)]
pub enum JobError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No driver registered under the requested name.
    #[error("Cannot find driver named '{name}'. Available options are: {}", .available.join(", "))]
    UnknownDriver { name: String, available: Vec<String> },

    /// Trigger expression could not be parsed.
    #[error("Invalid schedule for '{name}' ({expression}): {reason}")]
    InvalidSchedule {
        name: String,
        expression: String,
        reason: String,
    },

    /// Driver used before `configure` succeeded.
    #[error("Driver '{0}' is not configured")]
    NotConfigured(String),

    /// Job execution failed.
    #[error("Job execution failed: {0}")]
    Execution(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Returns true if this error must stop the process at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JobError::Configuration(_)
                | JobError::UnknownDriver { .. }
                | JobError::InvalidSchedule { .. }
                | JobError::NotConfigured(_)
        )
    }

    /// Short label used in metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            JobError::Configuration(_) => "configuration",
            JobError::UnknownDriver { .. } => "unknown_driver",
            JobError::InvalidSchedule { .. } => "invalid_schedule",
            JobError::NotConfigured(_) => "not_configured",
            JobError::Execution(_) => "execution",
            JobError::Serialization(_) => "serialization",
            JobError::Redis(_) => "redis",
            JobError::Pool(_) => "pool",
            JobError::Internal(_) => "internal",
        }
    }
}

impl From<JobError> for PonosError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Configuration(_) | JobError::UnknownDriver { .. } | JobError::NotConfigured(_) => {
                PonosError::Configuration(err.to_string())
            }
            JobError::InvalidSchedule { .. } => PonosError::Scheduling(err.to_string()),
            JobError::Redis(_) | JobError::Pool(_) => PonosError::Backend {
                backend: "redis".to_string(),
                message: err.to_string(),
            },
            JobError::Execution(_) | JobError::Serialization(_) | JobError::Internal(_) => {
                PonosError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_driver_lists_available() {
        let err = JobError::UnknownDriver {
            name: "foo".into(),
            available: vec!["sidekiq-activejob".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'foo'"));
        assert!(msg.contains("Available options are: sidekiq-activejob"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_schedule_is_fatal() {
        let err = JobError::InvalidSchedule {
            name: "report".into(),
            expression: "every tuesday".into(),
            reason: "bad field".into(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("every tuesday"));
    }

    #[test]
    fn test_execution_is_not_fatal() {
        assert!(!JobError::Execution("lpush failed".into()).is_fatal());
        assert!(!JobError::Internal("oops".into()).is_fatal());
        assert_eq!(JobError::Execution("x".into()).error_type(), "execution");
    }

    #[test]
    fn test_into_ponos_error() {
        let err: PonosError = JobError::NotConfigured("sidekiq-activejob".into()).into();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");

        let err: PonosError = JobError::InvalidSchedule {
            name: "x".into(),
            expression: "?".into(),
            reason: "?".into(),
        }
        .into();
        assert_eq!(err.error_code(), "SCHEDULING_ERROR");

        let err: PonosError = JobError::Execution("boom".into()).into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}

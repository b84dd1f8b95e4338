//! Process-level error type.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type surfaced by the Ponos process.
///
/// Library crates keep their own error enums and convert into this one at the
/// boundary where the process decides whether it can keep running.
#[derive(Error, Debug)]
pub enum PonosError {
    // ============ Startup Errors ============
    /// Configuration error (missing file, malformed values, unknown driver).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The schedule could not be built.
    #[error("Scheduling error: {0}")]
    Scheduling(String),

    // ============ Runtime Errors ============
    /// Backend store error.
    #[error("Backend error: {backend} - {message}")]
    Backend { backend: String, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PonosError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Scheduling(_) => "SCHEDULING_ERROR",
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the process exit code for this error (sysexits.h values).
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Scheduling(_) => 78,
            Self::Backend { .. } => 69,
            Self::Io(_) => 74,
            Self::Internal(_) | Self::Other(_) => 70,
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }
}

impl From<serde_json::Error> for PonosError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}

//! Result type aliases for Ponos.

use crate::PonosError;

/// A specialized `Result` type for process-level Ponos operations.
pub type PonosResult<T> = Result<T, PonosError>;

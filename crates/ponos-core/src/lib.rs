//! # Ponos Core
//!
//! Foundational pieces shared by every Ponos crate: the process-level
//! error type and the tracing subscriber setup.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
pub use telemetry::*;

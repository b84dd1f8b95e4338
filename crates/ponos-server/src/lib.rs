//! # Ponos Server Library
//!
//! Process-boundary pieces of the `ponos` binary: startup output, the
//! schedule table and the signal listener.

pub mod report;
pub mod signals;
pub mod startup;

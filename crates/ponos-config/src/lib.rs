//! # Ponos Config
//!
//! Configuration for Ponos: the `ponos.toml` structures, the named schedule
//! entries, validation and the file loader with `PONOS_*` overrides.

mod app_config;
mod loader;
mod schedule;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use schedule::*;
pub use validation::*;

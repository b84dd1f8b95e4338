//! Backend drivers and the registry that names them.

use crate::error::{JobError, JobResult};
use crate::sidekiq::{SidekiqActiveJobDriver, SIDEKIQ_ACTIVEJOB};
use async_trait::async_trait;
use ponos_config::{RedisConfig, ScheduleItem};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// A backend that turns schedule items into enqueued jobs.
///
/// `configure` is called once at startup; `execute` and `dry_run` may then be
/// called concurrently from any number of trigger firings.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Registry name of the driver.
    fn name(&self) -> &'static str;

    /// Connects to the backend and checks it is reachable.
    async fn configure(&mut self, settings: &RedisConfig) -> JobResult<()>;

    /// Enqueues one job for `item`.
    async fn execute(&self, item: &ScheduleItem) -> JobResult<()>;

    /// Logs the operations `execute` would perform, without performing them.
    async fn dry_run(&self, item: &ScheduleItem) -> JobResult<()>;
}

/// Constructor stored in the registry.
pub type DriverFactory = fn() -> Box<dyn Driver>;

/// Maps driver names to constructors.
///
/// Registering a name twice keeps the last factory.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.available())
            .finish()
    }
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in driver.
    pub fn with_defaults() -> Self {
        Self::from_factories([(SIDEKIQ_ACTIVEJOB, sidekiq_activejob as DriverFactory)])
    }

    /// Creates a registry from `(name, factory)` pairs.
    pub fn from_factories<'a>(pairs: impl IntoIterator<Item = (&'a str, DriverFactory)>) -> Self {
        let mut registry = Self::new();
        for (name, factory) in pairs {
            registry.register(name, factory);
        }
        registry
    }

    /// Registers a driver factory under `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: DriverFactory) {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            warn!(driver = %name, "Driver registered twice, keeping the last one");
        }
    }

    /// Builds a fresh, unconfigured driver.
    pub fn get(&self, name: &str) -> Option<Box<dyn Driver>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Like [`get`](Self::get), but the error lists the known drivers.
    pub fn resolve(&self, name: &str) -> JobResult<Box<dyn Driver>> {
        self.get(name).ok_or_else(|| JobError::UnknownDriver {
            name: name.to_string(),
            available: self.available(),
        })
    }

    /// Registered names, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

fn sidekiq_activejob() -> Box<dyn Driver> {
    Box::new(SidekiqActiveJobDriver::new())
}

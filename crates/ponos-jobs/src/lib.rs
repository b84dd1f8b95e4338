//! Ponos Jobs - Periodic Job Dispatching
//!
//! Fires schedule entries on their trigger expressions and enqueues an
//! ActiveJob-wrapped job in Sidekiq's format for each firing:
//! - Seconds-first cron, descriptor and `@every` trigger expressions
//! - One independent trigger per schedule entry
//! - Pluggable backend drivers selected by name
//! - Per-entry execution counters
//! - Dry-run of the whole schedule without touching the backend
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Ponos Jobs Architecture                   │
//! ├───────────────────────────────────────────────────────────┤
//! │                                                            │
//! │  ControlCommand ──► Controller                             │
//! │                        │                                   │
//! │                        ▼                                   │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │                  Dispatcher                          │  │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐             │  │
//! │  │  │Trigger 1 │ │Trigger 2 │ │Trigger N │             │  │
//! │  │  └────┬─────┘ └────┬─────┘ └────┬─────┘             │  │
//! │  │       └────────────┴────────────┘                    │  │
//! │  └────────────────────┬────────────────────────────────┘  │
//! │                       ▼                                    │
//! │        Driver (encoder ──► Redis: SADD + LPUSH)            │
//! │                       │                                    │
//! │                       ▼                                    │
//! │               ExecutionCounter                             │
//! │                                                            │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ponos_jobs::{Controller, DriverRegistry};
//! use std::sync::Arc;
//!
//! let mut driver = DriverRegistry::with_defaults().resolve(&config.driver)?;
//! driver.configure(&config.redis).await?;
//!
//! let controller = Controller::new(config.schedule, Arc::from(driver), config.shutdown_grace())?;
//! controller.start()?;
//! controller.run(commands, |rows| println!("{}", render_schedule(rows))).await;
//! ```

pub mod control;
pub mod dispatcher;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod executions;
pub mod metrics;
pub mod sidekiq;
pub mod task;
pub mod trigger;

pub use control::{ControlCommand, Controller, DryRunSummary, ScheduleRow};
pub use dispatcher::{Dispatcher, TriggerCallback, TriggerSnapshot, TriggerState};
pub use driver::{Driver, DriverFactory, DriverRegistry};
pub use encoder::{ActiveJobPayload, EncodedJob, JobEnvelope};
pub use error::{JobError, JobResult};
pub use executions::ExecutionCounter;
pub use metrics::{register_metrics, JobMetrics, SchedulerMetrics};
pub use sidekiq::{SidekiqActiveJobDriver, SIDEKIQ_ACTIVEJOB};
pub use task::{build_dispatcher, dispatch, dispatch_callback};
pub use trigger::Trigger;

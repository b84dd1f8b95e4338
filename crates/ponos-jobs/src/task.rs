//! Glue between schedule entries, the driver and the dispatcher.

use crate::dispatcher::{Dispatcher, TriggerCallback};
use crate::driver::Driver;
use crate::error::JobResult;
use crate::executions::ExecutionCounter;
use crate::metrics::JobMetrics;
use futures::FutureExt;
use ponos_config::{ScheduleItem, ScheduleRegistry};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Executes `item` once through `driver`.
///
/// Success bumps the entry's execution count and returns it. Failure is
/// logged and returned; the count is left untouched.
pub async fn dispatch(
    name: &str,
    item: &ScheduleItem,
    driver: &dyn Driver,
    counter: &ExecutionCounter,
) -> JobResult<u64> {
    let started = Instant::now();

    match driver.execute(item).await {
        Ok(()) => {
            let executions = counter.increment(name);
            JobMetrics::job_enqueued(name, started.elapsed());
            info!(task = %name, job = %item.job_name, executions, "Enqueued");
            Ok(executions)
        }
        Err(e) => {
            JobMetrics::job_failed(name, e.error_type(), started.elapsed());
            error!(task = %name, job = %item.job_name, error = %e, "Failed");
            Err(e)
        }
    }
}

/// Callback firing [`dispatch`] for one schedule entry.
pub fn dispatch_callback(
    name: String,
    item: Arc<ScheduleItem>,
    driver: Arc<dyn Driver>,
    counter: Arc<ExecutionCounter>,
) -> TriggerCallback {
    let name: Arc<str> = Arc::from(name);
    Arc::new(move || {
        let name = Arc::clone(&name);
        let item = Arc::clone(&item);
        let driver = Arc::clone(&driver);
        let counter = Arc::clone(&counter);
        async move {
            // Already logged; a failed firing never affects the next one.
            let _ = dispatch(&name, &item, driver.as_ref(), &counter).await;
        }
        .boxed()
    })
}

/// Builds a dispatcher with one trigger per schedule entry, keyed by the
/// entry name. Fails on the first invalid trigger expression.
pub fn build_dispatcher(
    schedule: &ScheduleRegistry,
    driver: Arc<dyn Driver>,
    counter: Arc<ExecutionCounter>,
) -> JobResult<Dispatcher> {
    let mut dispatcher = Dispatcher::new();

    for (name, item) in schedule {
        let callback = dispatch_callback(
            name.clone(),
            Arc::new(item.clone()),
            Arc::clone(&driver),
            Arc::clone(&counter),
        );
        dispatcher.add(name.clone(), &item.period, callback)?;
    }

    Ok(dispatcher)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fake drivers shared by the tests of this crate.

    use crate::driver::Driver;
    use crate::error::{JobError, JobResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use ponos_config::{RedisConfig, ScheduleItem};
    use std::collections::HashSet;
    use std::time::Duration;

    /// Records every call; fails `execute` for the listed job names.
    #[derive(Default)]
    pub struct RecordingDriver {
        pub executed: Mutex<Vec<String>>,
        pub dry_runs: Mutex<Vec<String>>,
        pub failing: HashSet<String>,
        pub delay: Option<Duration>,
    }

    impl RecordingDriver {
        pub fn failing_on(jobs: &[&str]) -> Self {
            Self {
                failing: jobs.iter().map(|job| job.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Driver for RecordingDriver {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn configure(&mut self, _settings: &RedisConfig) -> JobResult<()> {
            Ok(())
        }

        async fn execute(&self, item: &ScheduleItem) -> JobResult<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(&item.job_name) {
                return Err(JobError::Execution(format!("refused {}", item.job_name)));
            }
            self.executed.lock().push(item.job_name.clone());
            Ok(())
        }

        async fn dry_run(&self, item: &ScheduleItem) -> JobResult<()> {
            if self.failing.contains(&item.job_name) {
                return Err(JobError::Execution(format!("refused {}", item.job_name)));
            }
            self.dry_runs.lock().push(item.job_name.clone());
            Ok(())
        }
    }
}

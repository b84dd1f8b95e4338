//! Operator commands: schedule report, dry-run and shutdown.

use crate::dispatcher::Dispatcher;
use crate::driver::Driver;
use crate::error::JobResult;
use crate::executions::ExecutionCounter;
use crate::metrics::JobMetrics;
use crate::task::build_dispatcher;
use chrono::{DateTime, Utc};
use ponos_config::ScheduleRegistry;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Commands accepted while the dispatcher runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Print the schedule table.
    ReportSchedule,
    /// Dry-run every entry once.
    DryRunAll,
    /// Stop dispatching and exit.
    Shutdown,
}

/// One line of the schedule report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub name: String,
    pub period: String,
    pub prev: Option<DateTime<Utc>>,
    pub next: Option<DateTime<Utc>>,
    pub executions: u64,
}

/// Outcome of a dry-run pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DryRunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Owns the running dispatcher and answers [`ControlCommand`]s.
pub struct Controller {
    dispatcher: Dispatcher,
    schedule: ScheduleRegistry,
    driver: Arc<dyn Driver>,
    counter: Arc<ExecutionCounter>,
    grace: Duration,
}

impl Controller {
    /// Builds the dispatcher for `schedule`. The driver must already be
    /// configured.
    pub fn new(
        schedule: ScheduleRegistry,
        driver: Arc<dyn Driver>,
        grace: Duration,
    ) -> JobResult<Self> {
        let counter = Arc::new(ExecutionCounter::new());
        let dispatcher = build_dispatcher(&schedule, Arc::clone(&driver), Arc::clone(&counter))?;

        Ok(Self {
            dispatcher,
            schedule,
            driver,
            counter,
            grace,
        })
    }

    /// Starts dispatching.
    pub fn start(&self) -> JobResult<()> {
        self.dispatcher.start()
    }

    /// Dispatcher holding one trigger per schedule entry.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Successful executions per entry since start.
    pub fn counter(&self) -> &ExecutionCounter {
        &self.counter
    }

    /// Current schedule, soonest first.
    pub fn schedule_rows(&self) -> Vec<ScheduleRow> {
        self.dispatcher
            .entries()
            .into_iter()
            .map(|entry| ScheduleRow {
                executions: self.counter.get(&entry.name),
                period: self
                    .schedule
                    .get(&entry.name)
                    .map(|item| item.period.clone())
                    .unwrap_or(entry.expression),
                name: entry.name,
                prev: entry.prev,
                next: entry.next,
            })
            .collect()
    }

    /// Dry-runs every entry once, in name order. Failures are logged and do
    /// not stop the pass. Execution counts are not touched.
    pub async fn dry_run_all(&self) -> DryRunSummary {
        info!("Dry-running entire schedule...");

        let mut summary = DryRunSummary::default();
        for (name, item) in &self.schedule {
            match self.driver.dry_run(item).await {
                Ok(()) => {
                    JobMetrics::job_dry_run(name);
                    summary.succeeded += 1;
                }
                Err(e) => {
                    error!(task = %name, error = %e, "Dry-run failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Dry-run: Completed"
        );
        summary
    }

    /// Stops the dispatcher and waits for in-flight jobs. Returns false if
    /// some were still running after the grace period.
    pub async fn shutdown(&self) -> bool {
        self.dispatcher.stop();
        let idle = self.dispatcher.wait_idle(self.grace).await;
        if idle {
            info!("Shut down cleanly");
        }
        idle
    }

    /// Handles one command. Breaks with the shutdown outcome on
    /// [`ControlCommand::Shutdown`].
    pub async fn handle(
        &self,
        command: ControlCommand,
        render: &mut impl FnMut(&[ScheduleRow]),
    ) -> ControlFlow<bool> {
        match command {
            ControlCommand::ReportSchedule => {
                render(&self.schedule_rows());
                ControlFlow::Continue(())
            }
            ControlCommand::DryRunAll => {
                self.dry_run_all().await;
                ControlFlow::Continue(())
            }
            ControlCommand::Shutdown => ControlFlow::Break(self.shutdown().await),
        }
    }

    /// Processes commands until shutdown is requested or every sender is
    /// dropped. Returns whether in-flight jobs drained within the grace
    /// period.
    pub async fn run(
        &self,
        mut commands: mpsc::Receiver<ControlCommand>,
        mut render: impl FnMut(&[ScheduleRow]),
    ) -> bool {
        while let Some(command) = commands.recv().await {
            if let ControlFlow::Break(idle) = self.handle(command, &mut render).await {
                return idle;
            }
        }

        warn!("Control channel closed, shutting down");
        self.shutdown().await
    }
}

//! Metrics for schedule dispatching.
//!
//! Recorded through the `metrics` facade; without an installed recorder every
//! call is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names.
pub mod names {
    /// Jobs pushed to the backend.
    pub const JOBS_ENQUEUED_TOTAL: &str = "ponos_jobs_enqueued_total";
    /// Firings whose enqueue failed.
    pub const JOBS_FAILED_TOTAL: &str = "ponos_jobs_failed_total";
    /// Jobs dry-run.
    pub const JOBS_DRY_RUN_TOTAL: &str = "ponos_jobs_dry_run_total";
    /// Time spent enqueuing one job, in seconds.
    pub const ENQUEUE_DURATION_SECONDS: &str = "ponos_enqueue_duration_seconds";
    /// Triggers owned by the dispatcher.
    pub const SCHEDULES_REGISTERED: &str = "ponos_schedules_registered";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        names::JOBS_ENQUEUED_TOTAL,
        "Total number of jobs enqueued"
    );
    describe_counter!(
        names::JOBS_FAILED_TOTAL,
        "Total number of firings that failed to enqueue"
    );
    describe_counter!(
        names::JOBS_DRY_RUN_TOTAL,
        "Total number of jobs dry-run"
    );
    describe_histogram!(
        names::ENQUEUE_DURATION_SECONDS,
        "Enqueue duration in seconds"
    );
    describe_gauge!(
        names::SCHEDULES_REGISTERED,
        "Number of registered schedule entries"
    );
}

/// Per-entry job metrics recorder.
#[derive(Clone)]
pub struct JobMetrics;

impl JobMetrics {
    /// Record a job enqueued.
    pub fn job_enqueued(schedule: &str, duration: Duration) {
        counter!(
            names::JOBS_ENQUEUED_TOTAL,
            "schedule" => schedule.to_string()
        )
        .increment(1);

        histogram!(
            names::ENQUEUE_DURATION_SECONDS,
            "schedule" => schedule.to_string(),
            "status" => "enqueued"
        )
        .record(duration.as_secs_f64());
    }

    /// Record a failed firing.
    pub fn job_failed(schedule: &str, error_type: &str, duration: Duration) {
        counter!(
            names::JOBS_FAILED_TOTAL,
            "schedule" => schedule.to_string(),
            "error_type" => error_type.to_string()
        )
        .increment(1);

        histogram!(
            names::ENQUEUE_DURATION_SECONDS,
            "schedule" => schedule.to_string(),
            "status" => "failed"
        )
        .record(duration.as_secs_f64());
    }

    /// Record a dry-run.
    pub fn job_dry_run(schedule: &str) {
        counter!(
            names::JOBS_DRY_RUN_TOTAL,
            "schedule" => schedule.to_string()
        )
        .increment(1);
    }
}

/// Dispatcher metrics recorder.
#[derive(Clone)]
pub struct SchedulerMetrics;

impl SchedulerMetrics {
    /// Update the number of registered triggers.
    pub fn set_registered(count: usize) {
        gauge!(names::SCHEDULES_REGISTERED).set(count as f64);
    }
}

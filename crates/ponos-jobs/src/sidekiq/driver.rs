//! Driver enqueuing ActiveJob jobs for Sidekiq workers.

use super::{create_pool, enqueue_pipeline, planned_commands, SidekiqKeys};
use crate::driver::Driver;
use crate::encoder;
use crate::error::{JobError, JobResult};
use async_trait::async_trait;
use deadpool_redis::Pool;
use ponos_config::{RedisConfig, ScheduleItem};
use tracing::{debug, info};

/// Registry name of [`SidekiqActiveJobDriver`].
pub const SIDEKIQ_ACTIVEJOB: &str = "sidekiq-activejob";

/// Pushes ActiveJob-wrapped jobs onto Sidekiq's Redis lists.
#[derive(Default)]
pub struct SidekiqActiveJobDriver {
    pool: Option<Pool>,
    keys: SidekiqKeys,
}

impl SidekiqActiveJobDriver {
    /// Creates an unconfigured driver.
    pub fn new() -> Self {
        Self::default()
    }

    fn pool(&self) -> JobResult<&Pool> {
        self.pool
            .as_ref()
            .ok_or_else(|| JobError::NotConfigured(SIDEKIQ_ACTIVEJOB.to_string()))
    }
}

#[async_trait]
impl Driver for SidekiqActiveJobDriver {
    fn name(&self) -> &'static str {
        SIDEKIQ_ACTIVEJOB
    }

    async fn configure(&mut self, settings: &RedisConfig) -> JobResult<()> {
        self.keys = SidekiqKeys::with_namespace(settings.namespace.clone());
        self.pool = Some(create_pool(settings).await?);
        Ok(())
    }

    async fn execute(&self, item: &ScheduleItem) -> JobResult<()> {
        let pool = self.pool()?;
        let job = encoder::encode(item)?;

        let mut conn = pool.get().await?;
        let _: () = enqueue_pipeline(&self.keys, &job)
            .query_async(&mut *conn)
            .await?;

        debug!(queue = %job.queue, job = %item.job_name, "Pushed job");
        Ok(())
    }

    async fn dry_run(&self, item: &ScheduleItem) -> JobResult<()> {
        let job = encoder::encode(item)?;
        for command in planned_commands(&self.keys, &job) {
            info!(module = SIDEKIQ_ACTIVEJOB, "Running: {}", command);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_requires_configure() {
        let driver = SidekiqActiveJobDriver::new();
        let item = ScheduleItem::new("@hourly", "ReportJob");

        let err = driver.execute(&item).await.unwrap_err();
        assert!(matches!(err, JobError::NotConfigured(name) if name == SIDEKIQ_ACTIVEJOB));
    }

    #[tokio::test]
    async fn test_dry_run_works_without_connection() {
        let driver = SidekiqActiveJobDriver::new();
        let item = ScheduleItem::new("*/5 * * * *", "ReportJob").retry(true);

        tokio_test::assert_ok!(driver.dry_run(&item).await);
    }

    #[tokio::test]
    async fn test_configure_fails_for_unreachable_backend() {
        let mut driver = SidekiqActiveJobDriver::new();
        let settings = RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connect_timeout_secs: 2,
            ..RedisConfig::default()
        };

        let err = driver.configure(&settings).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(driver.pool.is_none());
    }
}

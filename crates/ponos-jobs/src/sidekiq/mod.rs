//! Sidekiq-compatible Redis backend.

mod driver;

pub use driver::{SidekiqActiveJobDriver, SIDEKIQ_ACTIVEJOB};

use crate::encoder::EncodedJob;
use crate::error::{JobError, JobResult};
use deadpool_redis::{Config, Pool, Runtime};
use ponos_config::RedisConfig;
use redis::IntoConnectionInfo;
use std::fmt;
use tracing::info;

/// Create a Redis connection pool and check the server answers `PING`.
pub async fn create_pool(config: &RedisConfig) -> JobResult<Pool> {
    info!("Creating Redis connection pool...");

    config
        .url
        .as_str()
        .into_connection_info()
        .map_err(|e| JobError::Configuration(format!("Invalid Redis URL: {}", e)))?;

    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| JobError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| JobError::Configuration(format!("Failed to create pool: {}", e)))?;

    let ping = async {
        let mut conn = pool.get().await?;
        redis::cmd("PING").query_async::<String>(&mut *conn).await?;
        Ok::<(), JobError>(())
    };

    match tokio::time::timeout(config.connect_timeout(), ping).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return Err(JobError::Configuration(format!("Cannot reach Redis: {}", e)));
        }
        Err(_) => {
            return Err(JobError::Configuration(format!(
                "Cannot reach Redis: no answer within {}s",
                config.connect_timeout_secs
            )));
        }
    }

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Redis key builder for the Sidekiq layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidekiqKeys {
    namespace: Option<String>,
}

impl SidekiqKeys {
    /// Keys without a namespace, as Sidekiq uses by default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys prefixed with `<namespace>:`.
    pub fn with_namespace(namespace: Option<String>) -> Self {
        Self { namespace }
    }

    fn key(&self, key: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}:{}", namespace, key),
            None => key.to_string(),
        }
    }

    /// Set of known queue names.
    pub fn queues(&self) -> String {
        self.key("queues")
    }

    /// List holding the pending jobs of a queue.
    pub fn queue(&self, queue_name: &str) -> String {
        self.key(&format!("queue:{}", queue_name))
    }
}

/// One Redis command of an enqueue, for dry-run output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub command: &'static str,
    pub key: String,
    pub value: String,
}

impl fmt::Display for PlannedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" \"{}\" \"{}\"", self.command, self.key, self.value)
    }
}

/// The commands performed by an enqueue, in order.
pub fn planned_commands(keys: &SidekiqKeys, job: &EncodedJob) -> Vec<PlannedCommand> {
    vec![
        PlannedCommand {
            command: "sadd",
            key: keys.queues(),
            value: job.queue.clone(),
        },
        PlannedCommand {
            command: "lpush",
            key: keys.queue(&job.queue),
            value: job.payload.clone(),
        },
    ]
}

/// Pipeline registering the queue and pushing the job onto its head.
///
/// Not a transaction: if the push fails the queue stays registered, which
/// Sidekiq tolerates.
pub fn enqueue_pipeline(keys: &SidekiqKeys, job: &EncodedJob) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.sadd(keys.queues(), &job.queue)
        .ignore()
        .lpush(keys.queue(&job.queue), &job.payload)
        .ignore();
    pipe
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;
    use ponos_config::ScheduleItem;

    fn job() -> EncodedJob {
        EncodedJob {
            queue: "default".to_string(),
            payload: r#"{"wrapped":"ReportJob"}"#.to_string(),
        }
    }

    #[test]
    fn test_sidekiq_keys() {
        let keys = SidekiqKeys::new();
        assert_eq!(keys.queues(), "queues");
        assert_eq!(keys.queue("default"), "queue:default");

        let keys = SidekiqKeys::with_namespace(Some("myapp".to_string()));
        assert_eq!(keys.queues(), "myapp:queues");
        assert_eq!(keys.queue("mailers"), "myapp:queue:mailers");
    }

    #[test]
    fn test_planned_commands() {
        let commands = planned_commands(&SidekiqKeys::new(), &job());
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].to_string(), r#""sadd" "queues" "default""#);
        assert_eq!(commands[1].command, "lpush");
        assert_eq!(commands[1].key, "queue:default");
        assert_eq!(commands[1].value, job().payload);
    }

    #[test]
    fn test_pipeline_sadd_then_lpush() {
        let packed = enqueue_pipeline(&SidekiqKeys::new(), &job()).get_packed_pipeline();
        let text = String::from_utf8_lossy(&packed);

        let sadd = text.find("SADD").unwrap();
        let lpush = text.find("LPUSH").unwrap();
        assert!(sadd < lpush);
        assert!(text.contains("\r\nqueues\r\n"));
        assert!(text.contains("\r\nqueue:default\r\n"));
        assert!(text.contains(r#"{"wrapped":"ReportJob"}"#));
    }

    #[test]
    fn test_schedule_item_encoded_into_pipeline() {
        let item = ScheduleItem::new("*/5 * * * *", "ReportJob").retry(true);
        let job = encode(&item).unwrap();
        assert_eq!(job.queue, "default");

        let packed = enqueue_pipeline(&SidekiqKeys::new(), &job).get_packed_pipeline();
        let text = String::from_utf8_lossy(&packed);
        let sadd = text.find("SADD").unwrap();
        let lpush = text.find("LPUSH").unwrap();
        assert!(sadd < lpush);
        assert!(text[sadd..lpush].contains("\r\nqueues\r\n$7\r\ndefault\r\n"));
        assert!(text[lpush..].contains("\r\nqueue:default\r\n"));
        assert!(text[lpush..].contains(&job.payload));

        let envelope: serde_json::Value = serde_json::from_str(&job.payload).unwrap();
        assert_eq!(envelope["wrapped"], "ReportJob");
        assert_eq!(envelope["queue"], "default");
        assert_eq!(envelope["retry"], true);
        assert_eq!(envelope["args"][0]["job_class"], "ReportJob");
    }

    #[tokio::test]
    async fn test_create_pool_rejects_malformed_url() {
        let config = RedisConfig {
            url: "definitely not a url".to_string(),
            ..RedisConfig::default()
        };

        let err = create_pool(&config).await.err().unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_create_pool_rejects_unreachable_server() {
        // Port 1 is reserved and never runs Redis.
        let config = RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connect_timeout_secs: 2,
            ..RedisConfig::default()
        };

        let err = create_pool(&config).await.err().unwrap();
        assert!(matches!(err, JobError::Configuration(msg) if msg.contains("Cannot reach Redis")));
    }
}

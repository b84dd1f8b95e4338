//! Sidekiq wire format for ActiveJob-wrapped jobs.
//!
//! A job pushed onto `queue:<name>` looks like:
//!
//! ```json
//! {
//!   "class": "ActiveJob::QueueAdapters::SidekiqAdapter::JobWrapper",
//!   "wrapped": "ReportJob",
//!   "queue": "default",
//!   "args": [{
//!     "job_class": "ReportJob",
//!     "job_id": "0b8c6c4e-5b1e-4a53-a7a8-6d2b9f0c1e2d",
//!     "provider_job_id": null,
//!     "queue_name": "default",
//!     "priority": null,
//!     "arguments": [],
//!     "locale": "en"
//!   }],
//!   "retry": true,
//!   "jid": "3f2a9c0e7d4b4e1f9a8b7c6",
//!   "created_at": 1700000000.1234567,
//!   "enqueued_at": 1700000000.1234567
//! }
//! ```

use crate::error::JobResult;
use chrono::{DateTime, Utc};
use ponos_config::ScheduleItem;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sidekiq worker class that unwraps ActiveJob payloads.
pub const JOB_WRAPPER_CLASS: &str = "ActiveJob::QueueAdapters::SidekiqAdapter::JobWrapper";

/// Locale attached to every ActiveJob payload.
pub const DEFAULT_LOCALE: &str = "en";

/// Length of a Sidekiq job id.
pub const JID_LENGTH: usize = 23;

/// Top-level Sidekiq job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub class: String,
    pub wrapped: String,
    pub queue: String,
    pub args: Vec<ActiveJobPayload>,
    pub retry: bool,
    pub jid: String,
    pub created_at: f64,
    pub enqueued_at: f64,
}

/// The serialized ActiveJob carried as the single Sidekiq argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveJobPayload {
    pub job_class: String,
    pub job_id: String,
    pub provider_job_id: Option<String>,
    pub queue_name: String,
    pub priority: Option<String>,
    pub arguments: Vec<serde_json::Value>,
    pub locale: String,
}

/// Target queue plus the serialized envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedJob {
    pub queue: String,
    pub payload: String,
}

/// Encodes `item` with the current time.
pub fn encode(item: &ScheduleItem) -> JobResult<EncodedJob> {
    encode_at(item, Utc::now())
}

/// Encodes `item` as if enqueued at `now`. Identifiers are still random.
pub fn encode_at(item: &ScheduleItem, now: DateTime<Utc>) -> JobResult<EncodedJob> {
    let envelope = build_envelope(item, now);
    let payload = serde_json::to_string(&envelope)?;
    Ok(EncodedJob {
        queue: envelope.queue,
        payload,
    })
}

/// Builds the envelope for `item`; both timestamps come from `now`.
pub fn build_envelope(item: &ScheduleItem, now: DateTime<Utc>) -> JobEnvelope {
    let queue = item.resolved_queue().to_string();
    let timestamp = epoch_seconds(now);

    JobEnvelope {
        class: JOB_WRAPPER_CLASS.to_string(),
        wrapped: item.job_name.clone(),
        queue: queue.clone(),
        args: vec![ActiveJobPayload {
            job_class: item.job_name.clone(),
            job_id: Uuid::new_v4().to_string(),
            provider_job_id: None,
            queue_name: queue,
            priority: None,
            arguments: Vec::new(),
            locale: DEFAULT_LOCALE.to_string(),
        }],
        retry: item.retry,
        jid: new_jid(),
        created_at: timestamp,
        enqueued_at: timestamp,
    }
}

/// Random Sidekiq job id: a v4 UUID without hyphens, cut to 23 characters.
pub fn new_jid() -> String {
    let mut jid = Uuid::new_v4().simple().to_string();
    jid.truncate(JID_LENGTH);
    jid
}

/// Seconds since the epoch at 100ns resolution (seven fractional digits).
pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    let ticks = at.timestamp() * 10_000_000 + i64::from(at.timestamp_subsec_nanos() / 100);
    ticks as f64 / 10_000_000.0
}

//! Schedule entries as read from the configuration file.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// Queue used when a schedule entry leaves `queue` empty.
pub const DEFAULT_QUEUE: &str = "default";

/// A single named schedule entry.
///
/// ```toml
/// [schedule.nightly_report]
/// period = "0 3 * * *"
/// job = "NightlyReportJob"
/// queue = "reports"
/// retry = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    /// Trigger expression (cron fields, descriptor or `@every <duration>`).
    pub period: String,

    /// Job class handed to the downstream worker.
    #[serde(rename = "job")]
    pub job_name: String,

    /// Logical queue name; empty means [`DEFAULT_QUEUE`].
    #[serde(default)]
    pub queue: String,

    /// Forwarded verbatim to the backend.
    #[serde(default)]
    pub retry: bool,
}

impl ScheduleItem {
    /// Creates a schedule item targeting the default queue without retries.
    pub fn new(period: impl Into<String>, job_name: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            job_name: job_name.into(),
            queue: String::new(),
            retry: false,
        }
    }

    /// Sets the queue name.
    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Sets the retry flag.
    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    /// The queue this item is enqueued on.
    pub fn resolved_queue(&self) -> &str {
        if self.queue.is_empty() {
            DEFAULT_QUEUE
        } else {
            &self.queue
        }
    }
}

/// Named schedule entries, keyed by entry name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleRegistry {
    entries: BTreeMap<String, ScheduleItem>,
}

impl ScheduleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the one it replaced.
    pub fn insert(&mut self, name: impl Into<String>, item: ScheduleItem) -> Option<ScheduleItem> {
        self.entries.insert(name.into(), item)
    }

    /// Looks up an entry by name.
    pub fn get(&self, name: &str) -> Option<&ScheduleItem> {
        self.entries.get(name)
    }

    /// Returns true if an entry with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ScheduleItem> {
        self.entries.iter()
    }

    /// Entry names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ScheduleItem)> for ScheduleRegistry {
    fn from_iter<I: IntoIterator<Item = (String, ScheduleItem)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ScheduleRegistry {
    type Item = (&'a String, &'a ScheduleItem);
    type IntoIter = btree_map::Iter<'a, String, ScheduleItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_queue_defaults() {
        let item = ScheduleItem::new("*/5 * * * *", "ReportJob");
        assert_eq!(item.resolved_queue(), "default");

        let item = item.queue("mailers");
        assert_eq!(item.resolved_queue(), "mailers");
    }

    #[test]
    fn test_item_from_toml_uses_job_key() {
        let item: ScheduleItem = toml::from_str(
            r#"
            period = "@hourly"
            job = "CleanupJob"
            "#,
        )
        .unwrap();

        assert_eq!(item.job_name, "CleanupJob");
        assert_eq!(item.queue, "");
        assert!(!item.retry);
    }

    #[test]
    fn test_registry_keeps_name_case() {
        let registry: ScheduleRegistry = toml::from_str(
            r#"
            [DailyDigest]
            period = "0 8 * * *"
            job = "DigestJob"
            retry = true
            "#,
        )
        .unwrap();

        assert!(registry.contains("DailyDigest"));
        assert!(registry.get("DailyDigest").unwrap().retry);
    }

    #[test]
    fn test_registry_iterates_in_name_order() {
        let registry: ScheduleRegistry = vec![
            ("zeta".to_string(), ScheduleItem::new("@daily", "Z")),
            ("alpha".to_string(), ScheduleItem::new("@daily", "A")),
        ]
        .into_iter()
        .collect();

        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(registry.len(), 2);
    }
}

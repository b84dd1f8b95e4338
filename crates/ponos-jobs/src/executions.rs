//! Per-entry execution counters.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Number of successful dispatches per schedule entry.
///
/// Counts only ever grow, by one per successful `execute`. A single mutex
/// guards reads and writes; callers never hold it across driver calls.
#[derive(Debug, Default)]
pub struct ExecutionCounter {
    counts: Mutex<HashMap<String, u64>>,
}

impl ExecutionCounter {
    /// Creates an empty counter store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one successful dispatch and returns the new count.
    pub fn increment(&self, name: &str) -> u64 {
        let mut counts = self.counts.lock();
        let count = counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Successful dispatches recorded for `name` (zero if never dispatched).
    pub fn get(&self, name: &str) -> u64 {
        self.counts.lock().get(name).copied().unwrap_or(0)
    }

    /// Copy of every count.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counts.lock().clone()
    }

    /// Sum over all entries.
    pub fn total(&self) -> u64 {
        self.counts.lock().values().sum()
    }
}

//! Clock-driven dispatcher owning one trigger per schedule entry.
//!
//! Every trigger runs its own loop: sleep until the next fire time, record
//! it, then spawn the callback on a separate task so a slow backend never
//! delays the next tick or any other trigger. Timestamps and state sit behind
//! a per-entry lock that is never held across an `.await`, so snapshots stay
//! cheap while firings are in flight.

use crate::error::{JobError, JobResult};
use crate::metrics::SchedulerMetrics;
use crate::trigger::Trigger;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Work run on every firing.
pub type TriggerCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Lifecycle of a trigger.
///
/// A firing is instantaneous: the trigger records the fire time and goes
/// straight back to `Armed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerState {
    /// Added, dispatcher not started.
    Registered,
    /// Waiting for its next fire time.
    Armed,
    /// No further firings.
    Stopped,
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerState::Registered => write!(f, "registered"),
            TriggerState::Armed => write!(f, "armed"),
            TriggerState::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone)]
struct TriggerTimes {
    state: TriggerState,
    prev: Option<DateTime<Utc>>,
    next: Option<DateTime<Utc>>,
}

struct TriggerEntry {
    name: String,
    expression: String,
    trigger: Trigger,
    times: RwLock<TriggerTimes>,
    callback: TriggerCallback,
}

impl TriggerEntry {
    fn snapshot(&self) -> TriggerSnapshot {
        let times = self.times.read().clone();
        TriggerSnapshot {
            name: self.name.clone(),
            expression: self.expression.clone(),
            state: times.state,
            prev: times.prev,
            next: times.next,
        }
    }
}

/// Point-in-time view of one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSnapshot {
    /// Schedule entry name.
    pub name: String,
    /// Trigger expression as configured.
    pub expression: String,
    /// Current state.
    pub state: TriggerState,
    /// Last fire time; `None` if it never fired.
    pub prev: Option<DateTime<Utc>>,
    /// Upcoming fire time; `None` before start, after stop, or when the
    /// expression has no future occurrence.
    pub next: Option<DateTime<Utc>>,
}

/// Owns the triggers and fires their callbacks.
pub struct Dispatcher {
    entries: Vec<Arc<TriggerEntry>>,
    shutdown_tx: broadcast::Sender<()>,
    running: AtomicBool,
    stopped: AtomicBool,
    loops: TaskTracker,
    firings: TaskTracker,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("entries", &self.entries.len())
            .field("running", &self.is_running())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            entries: Vec::new(),
            shutdown_tx,
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            loops: TaskTracker::new(),
            firings: TaskTracker::new(),
        }
    }

    /// Registers a trigger. Fails on an invalid expression or a duplicate
    /// name, and once the dispatcher has been started.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        expression: &str,
        callback: TriggerCallback,
    ) -> JobResult<()> {
        let name = name.into();
        let trigger = Trigger::parse(expression).map_err(|reason| JobError::InvalidSchedule {
            name: name.clone(),
            expression: expression.to_string(),
            reason,
        })?;

        self.add_trigger(name, expression, trigger, callback)
    }

    /// Registers an already parsed trigger; `expression` is kept for display.
    pub fn add_trigger(
        &mut self,
        name: impl Into<String>,
        expression: &str,
        trigger: Trigger,
        callback: TriggerCallback,
    ) -> JobResult<()> {
        let name = name.into();

        if self.running.load(Ordering::SeqCst) || self.stopped.load(Ordering::SeqCst) {
            return Err(JobError::Configuration(format!(
                "Cannot add '{}': dispatcher already started",
                name
            )));
        }
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(JobError::Configuration(format!(
                "Schedule entry '{}' registered twice",
                name
            )));
        }

        debug!(task = %name, expression = %expression, "Registered trigger");

        self.entries.push(Arc::new(TriggerEntry {
            name,
            expression: expression.to_string(),
            trigger,
            times: RwLock::new(TriggerTimes {
                state: TriggerState::Registered,
                prev: None,
                next: None,
            }),
            callback,
        }));

        Ok(())
    }

    /// Arms every trigger. Must be called from within a tokio runtime.
    pub fn start(&self) -> JobResult<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(JobError::Configuration("Dispatcher was stopped".to_string()));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(JobError::Configuration("Dispatcher already running".to_string()));
        }

        let now = Utc::now();
        for entry in &self.entries {
            {
                let mut times = entry.times.write();
                times.state = TriggerState::Armed;
                times.next = entry.trigger.next_after(now);
            }

            let shutdown_rx = self.shutdown_tx.subscribe();
            self.loops.spawn(run_trigger(
                Arc::clone(entry),
                shutdown_rx,
                self.firings.clone(),
            ));
        }

        SchedulerMetrics::set_registered(self.entries.len());
        info!(triggers = self.entries.len(), "Dispatcher started");

        Ok(())
    }

    /// Stops every trigger. In-flight callbacks keep running; see
    /// [`wait_idle`](Self::wait_idle).
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Stopping dispatcher...");
        for entry in &self.entries {
            let mut times = entry.times.write();
            times.state = TriggerState::Stopped;
            times.next = None;
        }

        let _ = self.shutdown_tx.send(());
        self.running.store(false, Ordering::SeqCst);
        self.loops.close();
        self.firings.close();
    }

    /// Waits up to `grace` for trigger loops and in-flight callbacks to
    /// finish after [`stop`](Self::stop). Returns false on timeout.
    pub async fn wait_idle(&self, grace: Duration) -> bool {
        let idle = async {
            self.loops.wait().await;
            self.firings.wait().await;
        };

        match tokio::time::timeout(grace, idle).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    in_flight = self.in_flight(),
                    grace_secs = grace.as_secs_f64(),
                    "In-flight jobs still running after grace period"
                );
                false
            }
        }
    }

    /// Consistent snapshot of every trigger, soonest first, never-scheduled
    /// last.
    pub fn entries(&self) -> Vec<TriggerSnapshot> {
        let mut snapshots: Vec<TriggerSnapshot> =
            self.entries.iter().map(|entry| entry.snapshot()).collect();
        snapshots.sort_by(|a, b| {
            (a.next.is_none(), a.next, &a.name).cmp(&(b.next.is_none(), b.next, &b.name))
        });
        snapshots
    }

    /// Snapshot of a single trigger.
    pub fn entry(&self, name: &str) -> Option<TriggerSnapshot> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.snapshot())
    }

    /// Names of all triggers.
    pub fn names(&self) -> HashSet<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Number of callbacks currently running.
    pub fn in_flight(&self) -> usize {
        self.firings.len()
    }

    /// Whether the dispatcher is started and not stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of registered triggers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no trigger is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

async fn run_trigger(
    entry: Arc<TriggerEntry>,
    mut shutdown_rx: broadcast::Receiver<()>,
    firings: TaskTracker,
) {
    loop {
        let next = entry.times.read().next;
        let Some(fire_at) = next else {
            debug!(task = %entry.name, "No upcoming fire time");
            break;
        };

        let wait = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        // The wall clock may lag the monotonic sleep slightly; never compute
        // the next occurrence from before the current one.
        let reference = std::cmp::max(Utc::now(), fire_at);

        {
            let mut times = entry.times.write();
            if times.state == TriggerState::Stopped {
                break;
            }
            times.prev = Some(fire_at);
            times.next = entry.trigger.next_after(reference);

            // Spawn under the lock so `stop` cannot slip in between.
            firings.spawn((entry.callback)());
        }

        debug!(task = %entry.name, "Trigger fired");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;

    fn counting(counter: Arc<AtomicUsize>) -> TriggerCallback {
        Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    fn noop() -> TriggerCallback {
        Arc::new(|| async {}.boxed())
    }

    /// Registers a sub-second interval, which expressions cannot describe.
    fn add_every(
        dispatcher: &mut Dispatcher,
        name: &str,
        millis: u64,
        callback: TriggerCallback,
    ) {
        let expression = format!("every {}ms", millis);
        let trigger = Trigger::Every(Duration::from_millis(millis));
        dispatcher
            .add_trigger(name, &expression, trigger, callback)
            .unwrap();
    }

    #[test]
    fn test_invalid_expression_fails_fast() {
        let mut dispatcher = Dispatcher::new();
        let err = dispatcher.add("broken", "every tuesday", noop()).unwrap_err();

        assert!(matches!(err, JobError::InvalidSchedule { ref name, .. } if name == "broken"));
        assert!(err.is_fatal());
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add("report", "@hourly", noop()).unwrap();
        let err = dispatcher.add("report", "@daily", noop()).unwrap_err();

        assert!(matches!(err, JobError::Configuration(_)));
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn test_snapshot_before_start() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add("report", "*/5 * * * *", noop()).unwrap();

        let snapshot = dispatcher.entry("report").unwrap();
        assert_eq!(snapshot.state, TriggerState::Registered);
        assert_eq!(snapshot.expression, "*/5 * * * *");
        assert!(snapshot.prev.is_none());
        assert!(snapshot.next.is_none());
    }

    #[test]
    fn test_add_trigger_keeps_expression_and_rejects_duplicates() {
        let mut dispatcher = Dispatcher::new();
        add_every(&mut dispatcher, "tick", 250, noop());

        let snapshot = dispatcher.entry("tick").unwrap();
        assert_eq!(snapshot.expression, "every 250ms");
        assert_eq!(snapshot.state, TriggerState::Registered);

        let err = dispatcher
            .add_trigger("tick", "@hourly", Trigger::parse("@hourly").unwrap(), noop())
            .unwrap_err();
        assert!(matches!(err, JobError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_start_arms_triggers_sorted_by_next() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add("slow", "@every 1h", noop()).unwrap();
        dispatcher.add("fast", "@every 1m", noop()).unwrap();
        dispatcher.start().unwrap();

        let entries = dispatcher.entries();
        assert_eq!(entries[0].name, "fast");
        assert_eq!(entries[1].name, "slow");
        assert!(entries.iter().all(|e| e.state == TriggerState::Armed));
        assert!(entries.iter().all(|e| e.next.unwrap() > Utc::now()));

        dispatcher.stop();
        assert!(dispatcher.wait_idle(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add("report", "@hourly", noop()).unwrap();

        dispatcher.start().unwrap();
        assert!(dispatcher.start().is_err());
        assert!(dispatcher.add("late", "@hourly", noop()).is_err());

        dispatcher.stop();
        assert!(dispatcher.start().is_err());
    }

    #[tokio::test]
    async fn test_triggers_fire_and_record_prev() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        add_every(&mut dispatcher, "tick", 50, counting(counter.clone()));

        dispatcher.start().unwrap();
        tokio::time::sleep(Duration::from_millis(330)).await;

        let snapshot = dispatcher.entry("tick").unwrap();
        assert!(snapshot.prev.is_some());
        assert!(snapshot.next.unwrap() > snapshot.prev.unwrap());

        dispatcher.stop();
        assert!(dispatcher.wait_idle(Duration::from_secs(1)).await);
        assert!(counter.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_no_firing_after_stop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        add_every(&mut dispatcher, "tick", 20, counting(counter.clone()));

        dispatcher.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        dispatcher.stop();
        assert!(dispatcher.wait_idle(Duration::from_secs(1)).await);

        let after_stop = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);

        let snapshot = dispatcher.entry("tick").unwrap();
        assert_eq!(snapshot.state, TriggerState::Stopped);
        assert!(snapshot.next.is_none());
        assert!(!dispatcher.is_running());
    }

    #[tokio::test]
    async fn test_stop_lets_in_flight_callback_finish() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let callback: TriggerCallback = {
            let started = started.clone();
            let finished = finished.clone();
            Arc::new(move || {
                let started = started.clone();
                let finished = finished.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                }
                .boxed()
            })
        };

        let mut dispatcher = Dispatcher::new();
        add_every(&mut dispatcher, "slow", 30, callback);
        dispatcher.start().unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(dispatcher.in_flight() >= 1);

        // Introspection does not wait for the running callback.
        let snapshot = dispatcher.entry("slow").unwrap();
        assert!(snapshot.prev.is_some());

        dispatcher.stop();
        assert!(dispatcher.wait_idle(Duration::from_secs(2)).await);
        assert_eq!(
            started.load(Ordering::SeqCst),
            finished.load(Ordering::SeqCst)
        );
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_independent_triggers() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        add_every(&mut dispatcher, "a", 40, counting(a.clone()));
        add_every(&mut dispatcher, "b", 60, counting(b.clone()));

        dispatcher.start().unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        dispatcher.stop();
        dispatcher.wait_idle(Duration::from_secs(1)).await;

        assert!(a.load(Ordering::SeqCst) >= 2);
        assert!(b.load(Ordering::SeqCst) >= 2);
        assert_eq!(dispatcher.names().len(), 2);
    }
}

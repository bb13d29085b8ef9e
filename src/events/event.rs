//! # Runtime events emitted by the supervisor, the job manager and the scheduler.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Shutdown events**: signal observed, close finished or failed
//! - **Component events**: starters starting/stopping/failing, closers closing/failing
//! - **Job events**: scheduling, rollback, drain, failed or panicked executions
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! component name, a reason and a count.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use appvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StarterFailed)
//!     .with_component("http")
//!     .with_reason("bind: address in use");
//!
//! assert_eq!(ev.kind, EventKind::StarterFailed);
//! assert_eq!(ev.component.as_deref(), Some("http"));
//! assert_eq!(ev.reason.as_deref(), Some("bind: address in use"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `component`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `component`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed or the runtime token was cancelled).
    ///
    /// Sets:
    /// - `reason`: `"signal"` or `"cancelled"`
    ShutdownRequested,

    /// Every closer returned successfully.
    ShutdownCompleted,

    /// Closing failed; the process is expected to terminate anyway.
    ///
    /// Sets:
    /// - `reason`: error message
    ShutdownFailed,

    /// OS signal listeners could not be installed; shutdown only follows cancellation.
    ///
    /// Sets:
    /// - `reason`: io error message
    SignalUnavailable,

    /// The start orchestration itself panicked; `start` returns `RuntimeError::Panicked`.
    ///
    /// Sets:
    /// - `reason`: panic info/message
    StartPanicked,

    // === Component events ===
    /// A starter is being launched.
    ///
    /// Sets:
    /// - `component`: starter name
    StarterStarting,

    /// A starter returned without error (or observed cancellation).
    ///
    /// Sets:
    /// - `component`: starter name
    StarterStopped,

    /// A starter failed or panicked.
    ///
    /// Sets:
    /// - `component`: starter name
    /// - `reason`: failure message
    StarterFailed,

    /// A closer returned successfully.
    ///
    /// Sets:
    /// - `component`: closer name
    CloserClosed,

    /// A closer failed or panicked.
    ///
    /// Sets:
    /// - `component`: closer name
    /// - `reason`: failure message
    CloserFailed,

    // === Job events ===
    /// All pending jobs were scheduled and the firing loop started.
    ///
    /// Sets:
    /// - `count`: number of scheduled jobs
    JobsScheduled,

    /// A job could not be scheduled; entries scheduled in the same call were rolled back.
    ///
    /// Sets:
    /// - `component`: job name
    /// - `reason`: scheduler error
    /// - `count`: number of entries rolled back
    JobScheduleFailed,

    /// Every in-flight job execution finished after stop.
    ///
    /// Sets:
    /// - `count`: number of unscheduled entries
    JobsDrained,

    /// A job execution returned an error.
    ///
    /// Sets:
    /// - `component`: job name
    /// - `reason`: error message
    JobFailed,

    /// A job execution panicked.
    ///
    /// Sets:
    /// - `component`: job name
    /// - `reason`: panic info
    JobPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the component, job or subscriber, if applicable.
    pub component: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Number of items affected (scheduled jobs, rolled back entries).
    pub count: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            component: None,
            reason: None,
            count: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a component name.
    #[inline]
    pub fn with_component(mut self, component: impl Into<Arc<str>>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_component(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_component(subscriber)
            .with_reason(info)
    }

    /// Whether the event reports a failure of any kind.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ShutdownFailed
                | EventKind::StartPanicked
                | EventKind::StarterFailed
                | EventKind::CloserFailed
                | EventKind::JobScheduleFailed
                | EventKind::JobFailed
                | EventKind::JobPanicked
                | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::StarterStarting);
        let b = Event::new(EventKind::StarterStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::JobScheduleFailed)
            .with_component("reports")
            .with_reason("invalid schedule")
            .with_count(2);
        assert_eq!(ev.component.as_deref(), Some("reports"));
        assert_eq!(ev.reason.as_deref(), Some("invalid schedule"));
        assert_eq!(ev.count, Some(2));
        assert!(ev.is_failure());
        assert!(!Event::new(EventKind::JobsScheduled).is_failure());
    }
}

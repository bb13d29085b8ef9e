//! # Scheduling engine seam.
//!
//! [`Scheduler`] is the adapter between the [`JobManager`](crate::JobManager)
//! and a cron-style engine. The manager owns lifecycle discipline (rollback,
//! state, drain-aware close); the engine only knows how to fire entries.
//!
//! [`CronScheduler`](crate::CronScheduler) is the shipped engine.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::error::ScheduleError;
use crate::jobs::JobRef;

/// Identifier of a scheduled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Snapshot of a scheduled entry.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Entry identifier.
    pub id: EntryId,
    /// Name of the scheduled job.
    pub job: Arc<str>,
    /// Recurrence expression as given by the job.
    pub schedule: Arc<str>,
    /// Next fire time, if the expression has any left.
    pub next: Option<DateTime<Utc>>,
}

/// Completes once a stopped engine has no in-flight executions left.
///
/// Cheap to clone; every clone observes the same completion, and waiting
/// again after completion returns immediately.
#[derive(Debug, Clone, Default)]
pub struct DrainSignal {
    done: CancellationToken,
}

impl DrainSignal {
    /// A signal that completes when [`DrainSignal::complete`] is called.
    pub fn pending() -> Self {
        Self::default()
    }

    /// A signal that is already complete.
    pub fn drained() -> Self {
        let signal = Self::default();
        signal.complete();
        signal
    }

    /// Marks the drain as complete.
    pub fn complete(&self) {
        self.done.cancel();
    }

    /// Whether the drain has completed.
    pub fn is_drained(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Waits for the drain to complete.
    pub async fn wait(&self) {
        self.done.cancelled().await
    }
}

/// Cron-style scheduling engine.
///
/// Methods are synchronous; `run` and `stop` may spawn onto the current tokio runtime.
pub trait Scheduler: Send + Sync + 'static {
    /// Registers `job` to fire according to `spec`.
    fn schedule(&self, spec: &str, job: JobRef) -> Result<EntryId, ScheduleError>;

    /// Unregisters an entry. Unknown ids are ignored.
    fn remove(&self, id: EntryId);

    /// Starts firing entries. No-op when already running.
    fn run(&self);

    /// Stops firing new executions and returns a signal for in-flight ones.
    fn stop(&self) -> DrainSignal;

    /// Snapshot of the scheduled entries, ordered by id.
    fn entries(&self) -> Vec<Entry>;
}

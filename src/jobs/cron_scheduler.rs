//! # Cron engine: fires scheduled jobs on tokio tasks.
//!
//! [`CronScheduler`] implements [`Scheduler`] on top of the `cron` crate
//! (expression parsing, next-fire computation) and a
//! [`TaskTracker`](tokio_util::task::TaskTracker) (drain on stop).
//!
//! ## Expressions
//! - 5 fields `min hour dom mon dow` (a `0` seconds field is prepended)
//! - 6 fields `sec min hour dom mon dow`
//! - 7 fields with a trailing year
//! - descriptors: `@yearly`, `@monthly`, `@weekly`, `@daily`, `@hourly`
//!
//! Numeric day-of-week follows the `cron` crate (`1` = Sunday); prefer names (`MON-FRI`).
//!
//! Expressions are evaluated in a [`CronTimezone`], host local time by default:
//! `0 0 3 * * *` fires at 03:00 on the host's wall clock. Fire times are
//! reported in UTC either way.
//!
//! ## Firing loop
//! ```text
//! run() ──► tracker.spawn(firing_loop)
//!             loop {
//!               ├─► fire every entry with next <= now  (tracker.spawn(job.run()))
//!               ├─► advance next for fired entries
//!               └─► sleep until earliest next | schedule()/remove() wake | stop
//!             }
//! stop() ──► cancel loop, tracker.close() ──► DrainSignal (loop + executions done)
//! ```
//!
//! Each execution runs on its own task. A job error publishes `JobFailed`, a
//! panic is caught and publishes `JobPanicked`; neither affects other entries.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, Utc};
use futures::FutureExt;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::lock;
use crate::error::{ScheduleError, panic_info};
use crate::events::{Bus, Event, EventKind};
use crate::jobs::JobRef;
use crate::jobs::scheduler::{DrainSignal, Entry, EntryId, Scheduler};

/// Parses a recurrence expression, accepting the 5-field form.
pub fn parse_schedule(spec: &str) -> Result<cron::Schedule, ScheduleError> {
    let spec = spec.trim();
    let expr = if spec.split_whitespace().count() == 5 {
        format!("0 {spec}")
    } else {
        spec.to_string()
    };
    cron::Schedule::from_str(&expr).map_err(|e| ScheduleError::Parse {
        spec: spec.to_string(),
        error: e.to_string(),
    })
}

/// Zone in which cron expressions are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CronTimezone {
    /// Host local time (`TZ`, or the system zone).
    #[default]
    Local,
    /// Coordinated universal time.
    Utc,
    /// A fixed offset from UTC (no daylight saving).
    Fixed(FixedOffset),
}

impl CronTimezone {
    /// Next fire time of `schedule` strictly after `now`, converted to UTC.
    pub fn next_after(&self, schedule: &cron::Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            CronTimezone::Local => schedule
                .after(&now.with_timezone(&Local))
                .next()
                .map(|t| t.with_timezone(&Utc)),
            CronTimezone::Utc => schedule.after(&now).next(),
            CronTimezone::Fixed(offset) => schedule
                .after(&now.with_timezone(offset))
                .next()
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

struct Slot {
    spec: Arc<str>,
    schedule: cron::Schedule,
    job: JobRef,
    next: Option<DateTime<Utc>>,
}

struct Inner {
    bus: Bus,
    timezone: CronTimezone,
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<EntryId, Slot>>,
    wake: Notify,
    tracker: TaskTracker,
    firing: Mutex<Option<CancellationToken>>,
}

/// Cron-expression scheduler running jobs on the current tokio runtime.
#[derive(Clone)]
pub struct CronScheduler {
    inner: Arc<Inner>,
}

impl CronScheduler {
    /// Creates a stopped scheduler evaluating expressions in host local time.
    pub fn new(bus: Bus) -> Self {
        Self::with_timezone(bus, CronTimezone::default())
    }

    /// Creates a stopped scheduler evaluating expressions in `timezone`.
    ///
    /// Job failures are published to `bus`.
    pub fn with_timezone(bus: Bus, timezone: CronTimezone) -> Self {
        Self {
            inner: Arc::new(Inner {
                bus,
                timezone,
                next_id: AtomicU64::new(1),
                entries: Mutex::new(BTreeMap::new()),
                wake: Notify::new(),
                tracker: TaskTracker::new(),
                firing: Mutex::new(None),
            }),
        }
    }

    /// Zone the expressions are evaluated in.
    pub fn timezone(&self) -> CronTimezone {
        self.inner.timezone
    }

    /// Whether the firing loop is running.
    pub fn is_running(&self) -> bool {
        lock(&self.inner.firing)
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }
}

impl Scheduler for CronScheduler {
    fn schedule(&self, spec: &str, job: JobRef) -> Result<EntryId, ScheduleError> {
        let schedule = parse_schedule(spec)?;
        let id = EntryId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let next = self.inner.timezone.next_after(&schedule, Utc::now());
        lock(&self.inner.entries).insert(
            id,
            Slot {
                spec: Arc::from(spec),
                schedule,
                job,
                next,
            },
        );
        self.inner.wake.notify_one();
        Ok(id)
    }

    fn remove(&self, id: EntryId) {
        if lock(&self.inner.entries).remove(&id).is_some() {
            self.inner.wake.notify_one();
        }
    }

    fn run(&self) {
        let mut firing = lock(&self.inner.firing);
        if firing.as_ref().is_some_and(|t| !t.is_cancelled()) {
            return;
        }

        let now = Utc::now();
        for slot in lock(&self.inner.entries).values_mut() {
            slot.next = self.inner.timezone.next_after(&slot.schedule, now);
        }

        let token = CancellationToken::new();
        self.inner.tracker.reopen();
        self.inner
            .tracker
            .spawn(firing_loop(Arc::clone(&self.inner), token.clone()));
        *firing = Some(token);
    }

    fn stop(&self) -> DrainSignal {
        if let Some(token) = lock(&self.inner.firing).take() {
            token.cancel();
        }
        self.inner.tracker.close();
        if self.inner.tracker.is_empty() {
            return DrainSignal::drained();
        }

        let signal = DrainSignal::pending();
        let tracker = self.inner.tracker.clone();
        let done = signal.clone();
        tokio::spawn(async move {
            tracker.wait().await;
            done.complete();
        });
        signal
    }

    fn entries(&self) -> Vec<Entry> {
        lock(&self.inner.entries)
            .iter()
            .map(|(id, slot)| Entry {
                id: *id,
                job: Arc::from(slot.job.name()),
                schedule: Arc::clone(&slot.spec),
                next: slot.next,
            })
            .collect()
    }
}

async fn firing_loop(inner: Arc<Inner>, token: CancellationToken) {
    loop {
        if token.is_cancelled() {
            break;
        }
        let now = Utc::now();
        for job in inner.take_due(now) {
            inner.fire(job);
        }
        let wait = inner.until_next(now);

        tokio::select! {
            _ = token.cancelled() => break,
            _ = inner.wake.notified() => {}
            _ = sleep_for(wait) => {}
        }
    }
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

impl Inner {
    /// Collects jobs due at `now` and advances their next fire time.
    fn take_due(&self, now: DateTime<Utc>) -> Vec<JobRef> {
        let mut entries = lock(&self.entries);
        let mut due = Vec::new();
        for slot in entries.values_mut() {
            if slot.next.is_some_and(|next| next <= now) {
                due.push(Arc::clone(&slot.job));
                slot.next = self.timezone.next_after(&slot.schedule, now);
            }
        }
        due
    }

    /// Time left until the earliest entry fires; `None` when nothing is pending.
    fn until_next(&self, now: DateTime<Utc>) -> Option<Duration> {
        lock(&self.entries)
            .values()
            .filter_map(|slot| slot.next)
            .min()
            .map(|next| (next - now).to_std().unwrap_or(Duration::ZERO))
    }

    fn fire(&self, job: JobRef) {
        let bus = self.bus.clone();
        self.tracker.spawn(async move {
            match std::panic::AssertUnwindSafe(job.run()).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => bus.publish(
                    Event::new(EventKind::JobFailed)
                        .with_component(job.name())
                        .with_reason(e.to_string()),
                ),
                Err(panic_err) => bus.publish(
                    Event::new(EventKind::JobPanicked)
                        .with_component(job.name())
                        .with_reason(panic_info(&*panic_err)),
                ),
            }
        });
    }
}

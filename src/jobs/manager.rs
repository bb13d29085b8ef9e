//! # JobManager: lifecycle discipline around a scheduling engine.
//!
//! ```text
//!            add_job (Idle only)
//!                 │
//!   ┌──────┐  start() ok   ┌─────────┐  close()   ┌──────────┐
//!   │ Idle │ ────────────► │ Started │ ─────────► │ Stopping │
//!   └──────┘               └─────────┘            └──────────┘
//!      ▲  │ start() err                                │  │
//!      │  └─ rollback, stay Idle                       │  │ deadline first:
//!      │                                               │  │ DrainInterrupted,
//!      └───────────── drain complete ──────────────────┘  │ stay Stopping
//!                                                         ▼
//!                                           retried close() waits same drain
//! ```
//!
//! ## Rules
//! - The pending list only grows while Idle; no duplicate detection.
//! - `start` schedules all pending jobs or none: a failure removes every
//!   entry created in the same call.
//! - While Idle no entry is scheduled; after a successful `start` there is one
//!   entry per pending job.
//! - `close` on an Idle manager returns immediately.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::components::{Closer, CloserRef, Starter};
use crate::core::lock;
use crate::error::{ComponentError, JobError};
use crate::events::{Bus, Event, EventKind};
use crate::jobs::JobRef;
use crate::jobs::cron_scheduler::{CronScheduler, CronTimezone};
use crate::jobs::scheduler::{DrainSignal, Entry, EntryId, Scheduler};

/// Lifecycle state of a [`JobManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobManagerState {
    /// Accepting jobs; nothing scheduled.
    Idle = 0,
    /// All pending jobs scheduled and firing.
    Started = 1,
    /// Stopped firing; waiting for in-flight executions.
    Stopping = 2,
}

impl JobManagerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => JobManagerState::Started,
            2 => JobManagerState::Stopping,
            _ => JobManagerState::Idle,
        }
    }
}

#[derive(Default)]
struct Book {
    jobs: Vec<JobRef>,
    entries: Vec<EntryId>,
    drain: Option<DrainSignal>,
}

/// Registers recurring jobs and drives them through a [`Scheduler`].
///
/// Registered with the supervisor as both a starter and a closer
/// (see [`Starter::closer`]).
pub struct JobManager {
    scheduler: Arc<dyn Scheduler>,
    bus: Bus,
    state: AtomicU8,
    book: Mutex<Book>,
}

impl JobManager {
    /// Creates an idle manager on top of `scheduler`.
    pub fn new(scheduler: Arc<dyn Scheduler>, bus: Bus) -> Self {
        Self {
            scheduler,
            bus,
            state: AtomicU8::new(JobManagerState::Idle as u8),
            book: Mutex::new(Book::default()),
        }
    }

    /// Creates an idle manager backed by a [`CronScheduler`] in host local time.
    pub fn with_cron(bus: Bus) -> Self {
        Self::with_cron_timezone(bus, CronTimezone::default())
    }

    /// Creates an idle manager backed by a [`CronScheduler`] evaluating in `timezone`.
    pub fn with_cron_timezone(bus: Bus, timezone: CronTimezone) -> Self {
        Self::new(
            Arc::new(CronScheduler::with_timezone(bus.clone(), timezone)),
            bus,
        )
    }

    /// Adds a job to the pending list. Only valid while idle.
    pub fn add_job(&self, job: JobRef) -> Result<(), JobError> {
        let mut book = lock(&self.book);
        if self.state() != JobManagerState::Idle {
            return Err(JobError::AddAfterStart);
        }
        book.jobs.push(job);
        Ok(())
    }

    /// Schedules every pending job and starts the engine.
    ///
    /// Returns as soon as the jobs are scheduled. On failure no entry is left
    /// scheduled and the manager stays idle.
    pub fn start(&self) -> Result<(), JobError> {
        self.start_unless(None)
    }

    /// [`start`](Self::start), skipped when `ctx` is already cancelled.
    ///
    /// The check runs under the book lock `close` takes, so a manager whose
    /// token was cancelled before scheduling never starts the engine.
    fn start_unless(&self, ctx: Option<&CancellationToken>) -> Result<(), JobError> {
        let mut book = lock(&self.book);
        if ctx.is_some_and(CancellationToken::is_cancelled) {
            return Ok(());
        }
        match self.state() {
            JobManagerState::Idle => {}
            JobManagerState::Started => return Err(JobError::AlreadyStarted),
            JobManagerState::Stopping => return Err(JobError::Stopping),
        }

        let mut ids = Vec::with_capacity(book.jobs.len());
        for job in &book.jobs {
            match self.scheduler.schedule(job.schedule(), Arc::clone(job)) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    for id in &ids {
                        self.scheduler.remove(*id);
                    }
                    self.bus.publish(
                        Event::new(EventKind::JobScheduleFailed)
                            .with_component(job.name())
                            .with_reason(e.to_string())
                            .with_count(ids.len()),
                    );
                    return Err(JobError::Schedule {
                        job: job.name().to_string(),
                        spec: job.schedule().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let count = ids.len();
        book.entries = ids;
        self.scheduler.run();
        self.set_state(JobManagerState::Started);
        self.bus
            .publish(Event::new(EventKind::JobsScheduled).with_count(count));
        Ok(())
    }

    /// Stops firing and waits for in-flight executions, bounded by `ctx`.
    ///
    /// If `ctx` fires first, returns [`JobError::DrainInterrupted`] and stays
    /// in [`JobManagerState::Stopping`]; calling `close` again keeps waiting
    /// on the same drain.
    pub async fn close(&self, ctx: &CancellationToken) -> Result<(), JobError> {
        let drain = {
            let mut book = lock(&self.book);
            match self.state() {
                JobManagerState::Idle => return Ok(()),
                JobManagerState::Started => {
                    let drain = self.scheduler.stop();
                    book.drain = Some(drain.clone());
                    self.set_state(JobManagerState::Stopping);
                    drain
                }
                JobManagerState::Stopping => book.drain.clone().unwrap_or_else(DrainSignal::drained),
            }
        };

        tokio::select! {
            biased;
            _ = drain.wait() => {
                self.finish_drain();
                Ok(())
            }
            _ = ctx.cancelled() => Err(JobError::DrainInterrupted),
        }
    }

    fn finish_drain(&self) {
        let mut book = lock(&self.book);
        if self.state() != JobManagerState::Stopping {
            return;
        }
        let ids = std::mem::take(&mut book.entries);
        for id in &ids {
            self.scheduler.remove(*id);
        }
        book.drain = None;
        self.set_state(JobManagerState::Idle);
        self.bus
            .publish(Event::new(EventKind::JobsDrained).with_count(ids.len()));
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobManagerState {
        JobManagerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: JobManagerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Whether jobs are scheduled and firing.
    pub fn is_running(&self) -> bool {
        self.state() == JobManagerState::Started
    }

    /// Scheduled entries as reported by the engine.
    pub fn entries(&self) -> Vec<Entry> {
        self.scheduler.entries()
    }

    /// Number of jobs ever added.
    pub fn jobs_count(&self) -> usize {
        lock(&self.book).jobs.len()
    }
}

#[async_trait]
impl Starter for JobManager {
    fn name(&self) -> &str {
        "job-manager"
    }

    /// Schedules the jobs, then holds until `ctx` is cancelled.
    async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        self.start_unless(Some(&ctx))?;
        ctx.cancelled().await;
        Ok(())
    }

    fn closer(self: Arc<Self>) -> Option<CloserRef> {
        Some(self)
    }
}

#[async_trait]
impl Closer for JobManager {
    fn name(&self) -> &str {
        "job-manager"
    }

    async fn close(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        JobManager::close(self, &ctx).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScheduleError;
    use crate::jobs::JobFn;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeScheduler {
        next: AtomicU64,
        scheduled: Mutex<Vec<(EntryId, String)>>,
        removed: Mutex<Vec<EntryId>>,
        runs: AtomicUsize,
        drain: Mutex<Option<DrainSignal>>,
    }

    impl FakeScheduler {
        fn complete_drain(&self) {
            self.drain.lock().unwrap().as_ref().unwrap().complete();
        }
    }

    impl Scheduler for FakeScheduler {
        fn schedule(&self, spec: &str, job: JobRef) -> Result<EntryId, ScheduleError> {
            if spec == "bad" {
                return Err(ScheduleError::Parse {
                    spec: spec.into(),
                    error: "malformed".into(),
                });
            }
            let id = EntryId(self.next.fetch_add(1, Ordering::SeqCst));
            self.scheduled
                .lock()
                .unwrap()
                .push((id, job.name().to_string()));
            Ok(id)
        }

        fn remove(&self, id: EntryId) {
            self.scheduled.lock().unwrap().retain(|(e, _)| *e != id);
            self.removed.lock().unwrap().push(id);
        }

        fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&self) -> DrainSignal {
            let drain = DrainSignal::pending();
            *self.drain.lock().unwrap() = Some(drain.clone());
            drain
        }

        fn entries(&self) -> Vec<Entry> {
            self.scheduled
                .lock()
                .unwrap()
                .iter()
                .map(|(id, name)| Entry {
                    id: *id,
                    job: Arc::from(name.as_str()),
                    schedule: Arc::from("0 * * * * *"),
                    next: None,
                })
                .collect()
        }
    }

    struct Fixable {
        fixed: AtomicBool,
    }

    #[async_trait]
    impl crate::jobs::Job for Fixable {
        fn name(&self) -> &str {
            "fixable"
        }
        fn schedule(&self) -> &str {
            if self.fixed.load(Ordering::SeqCst) {
                "0 * * * * *"
            } else {
                "bad"
            }
        }
        async fn run(&self) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    fn noop(name: &'static str) -> JobRef {
        JobFn::arc(name, "0 * * * * *", || async { Ok(()) })
    }

    fn manager() -> (Arc<FakeScheduler>, JobManager) {
        let fake = Arc::new(FakeScheduler::default());
        let jm = JobManager::new(fake.clone(), Bus::new(16));
        (fake, jm)
    }

    #[tokio::test]
    async fn test_add_after_start_is_rejected() {
        let (_fake, jm) = manager();
        jm.add_job(noop("a")).unwrap();
        jm.add_job(noop("b")).unwrap();
        jm.start().unwrap();

        assert_eq!(jm.add_job(noop("c")), Err(JobError::AddAfterStart));
        assert_eq!(jm.jobs_count(), 2);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let (fake, jm) = manager();
        jm.add_job(noop("a")).unwrap();
        jm.start().unwrap();

        assert_eq!(jm.start(), Err(JobError::AlreadyStarted));
        assert_eq!(fake.runs.load(Ordering::SeqCst), 1);
        assert_eq!(jm.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_same_job_twice_is_scheduled_twice() {
        let (_fake, jm) = manager();
        let job = noop("dup");
        jm.add_job(job.clone()).unwrap();
        jm.add_job(job).unwrap();
        jm.start().unwrap();
        assert_eq!(jm.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_schedule_rolls_back() {
        let (fake, jm) = manager();
        let fixable = Arc::new(Fixable {
            fixed: AtomicBool::new(false),
        });
        jm.add_job(noop("a")).unwrap();
        jm.add_job(noop("b")).unwrap();
        jm.add_job(fixable.clone()).unwrap();
        jm.add_job(noop("d")).unwrap();

        let err = jm.start().unwrap_err();
        assert!(matches!(err, JobError::Schedule { ref job, .. } if job == "fixable"));
        assert!(jm.entries().is_empty());
        assert!(!jm.is_running());
        assert_eq!(jm.state(), JobManagerState::Idle);
        assert_eq!(fake.removed.lock().unwrap().len(), 2);
        assert_eq!(fake.runs.load(Ordering::SeqCst), 0);

        fixable.fixed.store(true, Ordering::SeqCst);
        jm.start().unwrap();
        assert_eq!(jm.entries().len(), 4);
        assert!(jm.is_running());
    }

    #[tokio::test]
    async fn test_close_idle_returns_immediately() {
        let (_fake, jm) = manager();
        let ctx = CancellationToken::new();
        ctx.cancel();
        assert_eq!(jm.close(&ctx).await, Ok(()));
    }

    #[tokio::test]
    async fn test_close_waits_for_drain() {
        let (fake, jm) = manager();
        let jm = Arc::new(jm);
        jm.add_job(noop("a")).unwrap();
        jm.start().unwrap();

        let closing = {
            let jm = Arc::clone(&jm);
            tokio::spawn(async move { jm.close(&CancellationToken::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!closing.is_finished());
        assert_eq!(jm.state(), JobManagerState::Stopping);

        fake.complete_drain();
        assert_eq!(closing.await.unwrap(), Ok(()));
        assert!(!jm.is_running());
        assert_eq!(jm.state(), JobManagerState::Idle);
        assert!(jm.entries().is_empty());
    }

    #[tokio::test]
    async fn test_close_deadline_keeps_stopping_and_retry_completes() {
        let (fake, jm) = manager();
        jm.add_job(noop("a")).unwrap();
        jm.start().unwrap();

        let ctx = CancellationToken::new();
        ctx.cancel();
        assert_eq!(jm.close(&ctx).await, Err(JobError::DrainInterrupted));
        assert_eq!(jm.state(), JobManagerState::Stopping);
        assert_eq!(jm.start(), Err(JobError::Stopping));
        assert_eq!(jm.add_job(noop("late")), Err(JobError::AddAfterStart));

        fake.complete_drain();
        assert_eq!(jm.close(&CancellationToken::new()).await, Ok(()));
        assert_eq!(jm.state(), JobManagerState::Idle);

        jm.start().unwrap();
        assert_eq!(jm.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_starter_holds_until_cancelled() {
        let (_fake, jm) = manager();
        let jm = Arc::new(jm);
        jm.add_job(noop("a")).unwrap();

        let ctx = CancellationToken::new();
        let running = {
            let jm = Arc::clone(&jm);
            let ctx = ctx.clone();
            tokio::spawn(async move { Starter::start(&*jm, ctx).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(jm.is_running());
        assert!(!running.is_finished());

        ctx.cancel();
        assert_eq!(running.await.unwrap(), Ok(()));
        assert!(jm.clone().closer().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_starter_never_schedules() {
        let (fake, jm) = manager();
        jm.add_job(noop("a")).unwrap();

        let ctx = CancellationToken::new();
        ctx.cancel();
        assert_eq!(Starter::start(&jm, ctx).await, Ok(()));
        assert_eq!(jm.state(), JobManagerState::Idle);
        assert_eq!(fake.runs.load(Ordering::SeqCst), 0);
        assert!(jm.entries().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_starter_racing_close_leaves_nothing_running() {
        for _ in 0..200 {
            let (fake, jm) = manager();
            let jm = Arc::new(jm);
            jm.add_job(noop("a")).unwrap();

            let ctx = CancellationToken::new();
            let starting = {
                let jm = Arc::clone(&jm);
                let ctx = ctx.clone();
                tokio::spawn(async move { Starter::start(&*jm, ctx).await })
            };
            // Shutdown order: cancel the starter token, then close.
            ctx.cancel();
            let closing = {
                let jm = Arc::clone(&jm);
                tokio::spawn(async move { jm.close(&CancellationToken::new()).await })
            };

            assert_eq!(starting.await.unwrap(), Ok(()));
            while !closing.is_finished() {
                if let Some(drain) = fake.drain.lock().unwrap().as_ref() {
                    drain.complete();
                }
                tokio::task::yield_now().await;
            }
            assert_eq!(closing.await.unwrap(), Ok(()));
            assert_eq!(jm.state(), JobManagerState::Idle);
            assert!(jm.entries().is_empty());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_with_cron_waits_for_running_job() {
        let started = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let jm = JobManager::with_cron(Bus::new(16));
        let job: JobRef = {
            let started = started.clone();
            let finished = finished.clone();
            JobFn::arc("slow", "* * * * * *", move || {
                let started = started.clone();
                let finished = finished.clone();
                async move {
                    started.store(true, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    finished.store(true, Ordering::SeqCst);
                    Ok(())
                }
            })
        };
        jm.add_job(job).unwrap();
        jm.start().unwrap();

        tokio::time::timeout(Duration::from_secs(3), async {
            while !started.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        jm.close(&CancellationToken::new()).await.unwrap();
        assert!(finished.load(Ordering::SeqCst));
        assert!(!jm.is_running());
        assert!(jm.entries().is_empty());
    }
}

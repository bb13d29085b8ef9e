//! # Supervisor: concurrent startup, signal-driven shutdown, ordered close.
//!
//! The [`Supervisor`] owns the component registries, the event bus and a
//! [`SubscriberSet`]. `start` runs every registered starter on its own task,
//! `close` runs every registered closer in order.
//!
//! ## Lifecycle
//! ```text
//!   Unstarted ──start()──► Running ──shutdown / close()──► ShuttingDown ──► Stopped
//!       └────────────close()──────────────────────────────────┘
//! ```
//! Each transition happens once; a second `start` or `close` is rejected with
//! [`RuntimeError::InvalidState`].
//!
//! ## Start
//! ```text
//! start(parent)
//!   ├─► runtime = parent.child_token()
//!   ├─► spawn coordinator: wait SIGINT/SIGTERM | runtime cancelled
//!   │       └─► publish ShutdownRequested, runtime.cancel(),
//!   │           close(deadline = grace) ─► ShutdownCompleted | ShutdownFailed
//!   ├─► per starter (registration order):
//!   │       set.spawn(catch_unwind(starter.start(runtime)))   (own panic guard)
//!   └─► wait:
//!         ├─ every starter reported ─► aggregate failures, runtime.cancel()
//!         └─ runtime cancelled first ─► Ok, outcomes drained in background
//!       then wait for the coordinator and return
//! ```
//!
//! ## Close
//! Closers run sequentially in [`ShutdownOrder`]. With [`ClosePolicy::FailFast`]
//! the first failure stops the pass and is returned; later closers are not
//! invoked. With [`ClosePolicy::BestEffort`] every closer runs and failures are
//! aggregated.
//!
//! ## Example
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use appvisor::{StarterFn, StarterRef, Supervisor, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::builder(SupervisorConfig::default()).build();
//!
//!     let http: StarterRef = StarterFn::arc("http", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok(())
//!     });
//!     sup.add_parallel([http]);
//!
//!     sup.start(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::components::{CloserRef, StarterRef};
use crate::core::builder::SupervisorBuilder;
use crate::core::component_map::ComponentMap;
use crate::core::config::{ClosePolicy, ShutdownOrder, SupervisorConfig};
use crate::core::registry::{Registry, lock};
use crate::core::shutdown;
use crate::error::{ComponentError, ComponentFailure, JobError, RuntimeError, panic_info};
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{JobManager, JobRef};
use crate::subscribers::SubscriberSet;

/// Lifecycle state of a [`Supervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SupervisorState {
    /// Built, components may still be registered.
    Unstarted = 0,
    /// Starters are running.
    Running = 1,
    /// Closers are running.
    ShuttingDown = 2,
    /// Close finished.
    Stopped = 3,
}

impl SupervisorState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SupervisorState::Running,
            2 => SupervisorState::ShuttingDown,
            3 => SupervisorState::Stopped,
            _ => SupervisorState::Unstarted,
        }
    }

    /// Short stable name (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Unstarted => "unstarted",
            SupervisorState::Running => "running",
            SupervisorState::ShuttingDown => "shutting_down",
            SupervisorState::Stopped => "stopped",
        }
    }
}

/// Outcome of one starter task.
struct StarterReport {
    name: String,
    result: Result<(), ComponentError>,
}

/// Coordinates starters, closers, typed components and graceful shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    starters: Registry<StarterRef>,
    closers: Registry<CloserRef>,
    components: ComponentMap,
    state: AtomicU8,
    runtime_token: Mutex<Option<CancellationToken>>,
    stopped: CancellationToken,
}

impl Supervisor {
    /// Returns a builder for a supervisor with the given configuration.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: SupervisorConfig, bus: Bus, subs: Arc<SubscriberSet>) -> Self {
        Self {
            cfg,
            bus,
            subs,
            starters: Registry::new(),
            closers: Registry::new(),
            components: ComponentMap::default(),
            state: AtomicU8::new(SupervisorState::Unstarted as u8),
            runtime_token: Mutex::new(None),
            stopped: CancellationToken::new(),
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    pub(crate) fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Event bus shared with components (job manager, cron scheduler, custom publishers).
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SupervisorState {
        SupervisorState::from_u8(self.state.load(Ordering::Acquire))
    }

    // ---------------------------
    // Registration
    // ---------------------------

    /// Registers starters to run concurrently in `start`.
    ///
    /// A starter whose [`closer`](crate::Starter::closer) returns `Some` is also
    /// registered as a closer.
    pub fn add_parallel(&self, starters: impl IntoIterator<Item = StarterRef>) {
        for starter in starters {
            if let Some(closer) = Arc::clone(&starter).closer() {
                self.closers.add(closer);
            }
            self.starters.add(starter);
        }
    }

    /// Registers a closer that has no starter side (connection pools, publishers).
    pub fn add_closer(&self, closer: CloserRef) {
        self.closers.add(closer);
    }

    /// Builds a cron-backed [`JobManager`] for `jobs` and registers it.
    ///
    /// Expressions are evaluated in [`SupervisorConfig::cron_timezone`].
    /// Returns `Ok(None)` when `jobs` is empty; nothing is registered then.
    /// The manager is also provided as a component.
    pub fn add_jobs(
        &self,
        jobs: impl IntoIterator<Item = JobRef>,
    ) -> Result<Option<Arc<JobManager>>, JobError> {
        let mut jobs = jobs.into_iter().peekable();
        if jobs.peek().is_none() {
            return Ok(None);
        }

        let manager = Arc::new(JobManager::with_cron_timezone(
            self.bus.clone(),
            self.cfg.cron_timezone,
        ));
        for job in jobs {
            manager.add_job(job)?;
        }
        self.add_parallel([Arc::clone(&manager) as StarterRef]);
        self.provide(Arc::clone(&manager));
        Ok(Some(manager))
    }

    /// Stores a typed component for later lookup with [`component`](Self::component).
    pub fn provide<T: Any + Send + Sync>(&self, component: Arc<T>) {
        self.components.insert(component);
    }

    /// Returns the component of type `T`.
    ///
    /// # Panics
    /// Panics when `T` was never provided: the host asked for a subsystem its
    /// configuration does not enable.
    pub fn component<T: Any + Send + Sync>(&self) -> Arc<T> {
        match self.components.get::<T>() {
            Ok(c) => c,
            Err(e) => panic!("{e}"),
        }
    }

    /// Returns the component of type `T`, or [`RuntimeError::ComponentMissing`].
    pub fn try_component<T: Any + Send + Sync>(&self) -> Result<Arc<T>, RuntimeError> {
        self.components.get::<T>()
    }

    // ---------------------------
    // Start
    // ---------------------------

    /// Runs every registered starter until shutdown and returns once all closers ran.
    ///
    /// Shutdown is triggered by an OS termination signal (when enabled), by
    /// cancelling `parent`, by [`close`](Self::close), or by every starter exiting.
    ///
    /// Returns [`RuntimeError::Startup`] only when every starter exited on its
    /// own and some of them failed. Once shutdown is requested `start` returns
    /// `Ok(())` without waiting for the remaining starters; their failures are
    /// published as `StarterFailed` only. Close failures are published as
    /// `ShutdownFailed`.
    pub async fn start(self: &Arc<Self>, parent: CancellationToken) -> Result<(), RuntimeError> {
        let token = parent.child_token();
        {
            // Same lock as `close`: it either runs before the transition or sees the token.
            let mut slot = lock(&self.runtime_token);
            self.transition(
                &[SupervisorState::Unstarted],
                SupervisorState::Running,
                "start",
            )?;
            *slot = Some(token.clone());
        }

        let coordinator = tokio::spawn(Arc::clone(self).coordinate_shutdown(token.clone()));

        let outcome = AssertUnwindSafe(self.run_starters(&token))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic_err| {
                let info = panic_info(&*panic_err);
                self.bus
                    .publish(Event::new(EventKind::StartPanicked).with_reason(info.as_str()));
                Err(RuntimeError::Panicked { info })
            });

        token.cancel();
        if let Err(e) = coordinator.await {
            self.bus.publish(
                Event::new(EventKind::ShutdownFailed).with_reason(format!("coordinator: {e}")),
            );
        }
        outcome
    }

    /// Launches starters and waits for all of them or for cancellation.
    async fn run_starters(&self, token: &CancellationToken) -> Result<(), RuntimeError> {
        let mut set = JoinSet::new();
        for starter in self.starters.snapshot() {
            self.bus.publish(
                Event::new(EventKind::StarterStarting).with_component(starter.name()),
            );
            set.spawn(run_starter(starter, token.clone()));
        }

        let mut failures = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    drain_in_background(set, self.bus.clone());
                    return Ok(());
                }
                joined = set.join_next() => match joined {
                    Some(joined) => {
                        if let Some(failure) = record(&self.bus, joined) {
                            failures.push(failure);
                        }
                    }
                    None => break,
                },
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::Startup { failures })
        }
    }

    /// Waits for a shutdown trigger, then closes everything within the grace period.
    async fn coordinate_shutdown(self: Arc<Self>, token: CancellationToken) {
        let reason = self.wait_shutdown_trigger(&token).await;
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
        token.cancel();

        let (deadline, _guard) = shutdown::deadline_token(self.cfg.close_deadline());
        match self.close(deadline).await {
            Ok(()) => self.bus.publish(Event::new(EventKind::ShutdownCompleted)),
            // close() was called directly; wait for it to finish.
            Err(RuntimeError::InvalidState { .. }) => self.stopped.cancelled().await,
            Err(e) => self
                .bus
                .publish(Event::new(EventKind::ShutdownFailed).with_reason(e.to_string())),
        }
    }

    async fn wait_shutdown_trigger(&self, token: &CancellationToken) -> &'static str {
        if !self.cfg.handle_signals {
            token.cancelled().await;
            return "cancelled";
        }

        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => match res {
                Ok(()) => "signal",
                Err(e) => {
                    self.bus.publish(
                        Event::new(EventKind::SignalUnavailable).with_reason(e.to_string()),
                    );
                    token.cancelled().await;
                    "cancelled"
                }
            },
            _ = token.cancelled() => "cancelled",
        }
    }

    // ---------------------------
    // Close
    // ---------------------------

    /// Cancels running starters and invokes every closer in the configured order.
    ///
    /// `ctx` is handed to each closer as its deadline. Valid once, from
    /// `Unstarted` or `Running`.
    pub async fn close(&self, ctx: CancellationToken) -> Result<(), RuntimeError> {
        let runtime = {
            let slot = lock(&self.runtime_token);
            self.transition(
                &[SupervisorState::Unstarted, SupervisorState::Running],
                SupervisorState::ShuttingDown,
                "close",
            )?;
            slot.clone()
        };
        if let Some(token) = runtime {
            token.cancel();
        }

        let result = self.close_all(&ctx).await;
        self.set_state(SupervisorState::Stopped);
        self.stopped.cancel();
        result
    }

    async fn close_all(&self, ctx: &CancellationToken) -> Result<(), RuntimeError> {
        let mut closers = self.closers.snapshot();
        if self.cfg.shutdown_order == ShutdownOrder::Reverse {
            closers.reverse();
        }

        let mut failures = Vec::new();
        for closer in closers {
            let res = AssertUnwindSafe(closer.close(ctx.clone()))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic_err| {
                    Err(ComponentError::Panicked {
                        info: panic_info(&*panic_err),
                    })
                });

            match res {
                Ok(()) => self.bus.publish(
                    Event::new(EventKind::CloserClosed).with_component(closer.name()),
                ),
                Err(error) => {
                    self.bus.publish(
                        Event::new(EventKind::CloserFailed)
                            .with_component(closer.name())
                            .with_reason(error.to_string()),
                    );
                    failures.push(ComponentFailure {
                        component: closer.name().to_string(),
                        error,
                    });
                    if self.cfg.close_policy == ClosePolicy::FailFast {
                        break;
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::Shutdown { failures })
        }
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn transition(
        &self,
        from: &[SupervisorState],
        to: SupervisorState,
        op: &'static str,
    ) -> Result<(), RuntimeError> {
        for state in from {
            if self
                .state
                .compare_exchange(*state as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(());
            }
        }
        Err(RuntimeError::InvalidState {
            op,
            state: self.state().as_str(),
        })
    }

    fn set_state(&self, state: SupervisorState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Runs one starter under its own panic guard.
async fn run_starter(starter: StarterRef, token: CancellationToken) -> StarterReport {
    let result = AssertUnwindSafe(starter.start(token))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic_err| {
            Err(ComponentError::Panicked {
                info: panic_info(&*panic_err),
            })
        });
    StarterReport {
        name: starter.name().to_string(),
        result,
    }
}

/// Publishes the outcome of a starter task; returns it when it is a failure.
///
/// `Canceled` counts as a graceful stop.
fn record(bus: &Bus, joined: Result<StarterReport, JoinError>) -> Option<ComponentFailure> {
    let report = joined.unwrap_or_else(|e| StarterReport {
        name: "unknown".to_string(),
        result: Err(ComponentError::Panicked {
            info: e.to_string(),
        }),
    });

    match report.result {
        Ok(()) | Err(ComponentError::Canceled) => {
            bus.publish(Event::new(EventKind::StarterStopped).with_component(report.name));
            None
        }
        Err(error) => {
            bus.publish(
                Event::new(EventKind::StarterFailed)
                    .with_component(report.name.as_str())
                    .with_reason(error.to_string()),
            );
            Some(ComponentFailure {
                component: report.name,
                error,
            })
        }
    }
}

/// Keeps collecting starter outcomes after `start` stopped waiting for them.
fn drain_in_background(mut set: JoinSet<StarterReport>, bus: Bus) {
    tokio::spawn(async move {
        while let Some(joined) = set.join_next().await {
            record(&bus, joined);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{CloserFn, StarterFn};
    use std::time::Duration;
    use tokio::time::Instant;

    fn cfg() -> SupervisorConfig {
        SupervisorConfig {
            grace: Duration::from_secs(1),
            handle_signals: false,
            ..SupervisorConfig::default()
        }
    }

    fn waiting(name: &'static str) -> StarterRef {
        StarterFn::arc(name, |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok(())
        })
    }

    fn failing(name: &'static str, msg: &'static str) -> StarterRef {
        StarterFn::arc(name, move |_ctx: CancellationToken| async move {
            Err(ComponentError::fail(msg))
        })
    }

    fn tracked(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>, fail: bool) -> CloserRef {
        CloserFn::arc(name, move |_ctx: CancellationToken| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                if fail {
                    Err(ComponentError::fail(format!("{name} refused to close")))
                } else {
                    Ok(())
                }
            }
        })
    }

    #[tokio::test]
    async fn test_aggregates_every_starter_failure() {
        let sup = Supervisor::builder(cfg()).build();
        sup.add_parallel([
            StarterFn::arc("ok-1", |_ctx: CancellationToken| async { Ok(()) }) as StarterRef,
            failing("http", "bind: address in use"),
            StarterFn::arc("ok-2", |_ctx: CancellationToken| async { Ok(()) }) as StarterRef,
            failing("grpc", "tls: bad certificate"),
            StarterFn::arc("ok-3", |_ctx: CancellationToken| async { Ok(()) }) as StarterRef,
        ]);

        let err = sup.start(CancellationToken::new()).await.unwrap_err();
        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        let mut names: Vec<_> = failures.iter().map(|f| f.component.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["grpc", "http"]);
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn test_no_failures_returns_ok_and_closes() {
        let sup = Supervisor::builder(cfg()).build();
        let log = Arc::new(Mutex::new(Vec::new()));
        sup.add_parallel([
            StarterFn::arc("a", |_ctx: CancellationToken| async { Ok(()) }) as StarterRef,
            StarterFn::arc("b", |_ctx: CancellationToken| async {
                Err(ComponentError::Canceled)
            }) as StarterRef,
        ]);
        sup.add_closer(tracked("db", log.clone(), false));

        sup.start(CancellationToken::new()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["db"]);
    }

    #[tokio::test]
    async fn test_close_stops_at_first_failure() {
        let sup = Supervisor::builder(cfg()).build();
        let log = Arc::new(Mutex::new(Vec::new()));
        sup.add_closer(tracked("a", log.clone(), false));
        sup.add_closer(tracked("b", log.clone(), true));
        sup.add_closer(tracked("c", log.clone(), false));

        let err = sup.close(CancellationToken::new()).await.unwrap_err();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert!(matches!(err, RuntimeError::Shutdown { .. }));
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].component, "b");
        assert_eq!(
            err.failures()[0].error,
            ComponentError::fail("b refused to close")
        );
    }

    #[tokio::test]
    async fn test_best_effort_reverse_close() {
        let sup = Supervisor::builder(SupervisorConfig {
            shutdown_order: ShutdownOrder::Reverse,
            close_policy: ClosePolicy::BestEffort,
            ..cfg()
        })
        .build();
        let log = Arc::new(Mutex::new(Vec::new()));
        sup.add_closer(tracked("a", log.clone(), true));
        sup.add_closer(tracked("b", log.clone(), false));
        sup.add_closer(tracked("c", log.clone(), true));

        let err = sup.close(CancellationToken::new()).await.unwrap_err();
        assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
        let names: Vec<_> = err.failures().iter().map(|f| f.component.as_str()).collect();
        assert_eq!(names, vec!["c", "a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_returns_without_waiting_for_slow_starters() {
        let sup = Supervisor::builder(cfg()).build();
        let mut rx = sup.bus().subscribe();

        let stubborn = |name: &'static str| -> StarterRef {
            StarterFn::arc(name, |_ctx: CancellationToken| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
        };
        sup.add_parallel([
            stubborn("one"),
            StarterFn::arc("two", |_ctx: CancellationToken| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err(ComponentError::fail("broker unreachable"))
            }) as StarterRef,
            stubborn("three"),
        ]);

        let parent = CancellationToken::new();
        {
            let parent = parent.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                parent.cancel();
            });
        }

        let began = Instant::now();
        sup.start(parent).await.unwrap();
        assert!(began.elapsed() < Duration::from_secs(1));

        let mut failed = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::StarterFailed {
                failed.push(ev.component.as_deref().map(str::to_string));
            }
        }
        assert_eq!(failed, vec![Some("two".to_string())]);
    }

    #[tokio::test]
    async fn test_start_and_close_are_single_use() {
        let sup = Supervisor::builder(cfg()).build();
        sup.start(CancellationToken::new()).await.unwrap();

        let err = sup.start(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InvalidState { op: "start", state: "stopped" }
        ));
        let err = sup.close(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidState { op: "close", .. }));
    }

    #[tokio::test]
    async fn test_starter_panic_becomes_failure() {
        let sup = Supervisor::builder(cfg()).build();
        sup.add_parallel([
            StarterFn::arc("boom", |_ctx: CancellationToken| async {
                if true {
                    panic!("listener exploded");
                }
                Ok(())
            }) as StarterRef,
        ]);

        let err = sup.start(CancellationToken::new()).await.unwrap_err();
        assert_eq!(
            err.failures()[0].error,
            ComponentError::Panicked {
                info: "listener exploded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_direct_close_ends_start() {
        let sup = Supervisor::builder(cfg()).build();
        let log = Arc::new(Mutex::new(Vec::new()));
        sup.add_parallel([waiting("http")]);
        sup.add_closer(tracked("db", log.clone(), false));

        let running = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.start(CancellationToken::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sup.state(), SupervisorState::Running);

        sup.close(CancellationToken::new()).await.unwrap();
        running.await.unwrap().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["db"]);
    }

    struct Nameless;

    #[async_trait::async_trait]
    impl crate::components::Starter for Nameless {
        fn name(&self) -> &str {
            panic!("name table corrupted")
        }

        async fn start(&self, _ctx: CancellationToken) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_orchestration_panic_is_published() {
        let sup = Supervisor::builder(cfg()).build();
        let mut rx = sup.bus().subscribe();
        sup.add_parallel([Arc::new(Nameless) as StarterRef]);

        let err = sup.start(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Panicked { ref info } if info == "name table corrupted"));
        assert_eq!(sup.state(), SupervisorState::Stopped);

        let mut reason = None;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::StartPanicked {
                reason = ev.reason.clone();
            }
        }
        assert_eq!(reason.as_deref(), Some("name table corrupted"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_close_racing_start_never_strands_starters() {
        for _ in 0..100 {
            let sup = Supervisor::builder(cfg()).build();
            sup.add_parallel([waiting("http")]);

            let starting = {
                let sup = Arc::clone(&sup);
                tokio::spawn(async move { sup.start(CancellationToken::new()).await })
            };
            let closing = {
                let sup = Arc::clone(&sup);
                tokio::spawn(async move { sup.close(CancellationToken::new()).await })
            };

            closing.await.unwrap().unwrap();
            let started = tokio::time::timeout(Duration::from_secs(5), starting)
                .await
                .expect("start must end once close ran")
                .unwrap();
            assert!(matches!(
                started,
                Ok(()) | Err(RuntimeError::InvalidState { op: "start", .. })
            ));
            assert_eq!(sup.state(), SupervisorState::Stopped);
        }
    }

    #[tokio::test]
    async fn test_add_jobs_uses_configured_cron_timezone() {
        use chrono::Timelike;

        let plus3 = chrono::FixedOffset::east_opt(3 * 3600).unwrap();
        let sup = Supervisor::builder(SupervisorConfig {
            cron_timezone: crate::jobs::CronTimezone::Fixed(plus3),
            ..cfg()
        })
        .build();
        let job = crate::jobs::JobFn::arc("nightly", "0 0 3 * * *", || async { Ok(()) });
        let manager = sup.add_jobs([job as JobRef]).unwrap().unwrap();

        manager.start().unwrap();
        let next = manager.entries()[0].next.unwrap();
        assert_eq!(next.with_timezone(&plus3).hour(), 3);
        assert_eq!(next.hour(), 0);
        manager.close(&CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_job_manager_registers_as_closer() {
        let sup = Supervisor::builder(cfg()).build();
        assert!(sup.add_jobs(Vec::new()).unwrap().is_none());
        assert!(sup.starters.is_empty());

        let job = crate::jobs::JobFn::arc("report", "0 0 * * * *", || async { Ok(()) });
        let manager = sup.add_jobs([job as JobRef]).unwrap().unwrap();
        assert_eq!(manager.jobs_count(), 1);
        assert_eq!(sup.starters.len(), 1);
        assert_eq!(sup.closers.len(), 1);
        assert!(Arc::ptr_eq(&sup.component::<JobManager>(), &manager));
    }

    #[tokio::test]
    #[should_panic(expected = "is not initialized or not required")]
    async fn test_missing_component_is_fatal() {
        struct Redis;
        let sup = Supervisor::builder(cfg()).build();
        let _ = sup.component::<Redis>();
    }
}

//! # appvisor
//!
//! **Appvisor** is a process lifecycle supervisor for long-running services.
//!
//! A host process registers its subsystems (HTTP and RPC servers, broker
//! subscribers, database pools, recurring jobs) as *starters* and *closers*.
//! The [`Supervisor`] starts every starter concurrently, waits for a
//! termination signal or cancellation, then closes every closer in a fixed
//! order within a grace period.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Starter    │   │   Starter    │   │  JobManager  │
//!     │ (http, rpc)  │   │ (subscriber) │   │ (cron jobs)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Registry<StarterRef> / Registry<CloserRef> (ordered)           │
//! │  - ComponentMap (typed accessors)                                 │
//! │  - shutdown coordinator (SIGINT/SIGTERM, token, close())          │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ StarterStarting  │ CloserClosed     │ JobsScheduled
//!        │ StarterFailed    │ CloserFailed     │ JobFailed
//!        ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │              (capacity: SupervisorConfig::bus_capacity)           │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      worker1   worker2   workerN
//! ```
//!
//! ### Lifecycle
//! ```text
//! start(parent)
//!   ├─► every starter on its own task ─► StarterStarting
//!   │       ├─ Ok / Canceled ─► StarterStopped
//!   │       └─ Err / panic   ─► StarterFailed
//!   ├─► shutdown trigger: signal | parent cancelled | close() | all starters exited
//!   │       └─► ShutdownRequested ─► close(grace deadline)
//!   │               ├─ closers in ShutdownOrder, ClosePolicy on failure
//!   │               └─► ShutdownCompleted | ShutdownFailed
//!   └─► Err(Startup{failures}) only if starters failed before shutdown
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                       |
//! |-------------------|-----------------------------------------------------------|------------------------------------------|
//! | **Components**    | Blocking starters and resource closers.                   | [`Starter`], [`Closer`], [`StarterFn`]   |
//! | **Supervision**   | Concurrent start, ordered close, typed accessors.         | [`Supervisor`], [`SupervisorState`]      |
//! | **Jobs**          | Recurring cron jobs with rollback and drain on close.     | [`Job`], [`JobManager`], [`Scheduler`]   |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, alerting).  | [`Subscribe`], [`Event`]                 |
//! | **Errors**        | Typed errors for components, runtime and jobs.            | [`ComponentError`], [`RuntimeError`]     |
//! | **Configuration** | Grace period, close order and policy, signals.            | [`SupervisorConfig`]                     |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use appvisor::{CloserFn, JobFn, JobRef, StarterFn, StarterRef, Supervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig {
//!         grace: Duration::from_secs(5),
//!         handle_signals: false,
//!         ..SupervisorConfig::default()
//!     };
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn appvisor::Subscribe>> = vec![Arc::new(appvisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn appvisor::Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(cfg).with_subscribers(subs).build();
//!
//!     let http: StarterRef = StarterFn::arc("http", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok(())
//!     });
//!     sup.add_parallel([http]);
//!     sup.add_closer(CloserFn::arc("db", |_ctx: CancellationToken| async { Ok(()) }));
//!
//!     let report: JobRef = JobFn::arc("report", "0 0 3 * * *", || async { Ok(()) });
//!     sup.add_jobs([report])?;
//!
//!     let parent = CancellationToken::new();
//!     parent.cancel();
//!     sup.start(parent).await?;
//!     Ok(())
//! }
//! ```
mod components;
mod core;
mod error;
mod events;
mod jobs;
mod subscribers;

// ---- Public re-exports ----

pub use components::{Closer, CloserFn, CloserRef, Starter, StarterFn, StarterRef};
pub use core::{
    ClosePolicy, ComponentMap, Registry, ShutdownOrder, Supervisor, SupervisorBuilder,
    SupervisorConfig, SupervisorState,
};
pub use error::{ComponentError, ComponentFailure, JobError, RuntimeError, ScheduleError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{
    CronScheduler, CronTimezone, DrainSignal, Entry, EntryId, Job, JobFn, JobManager, JobManagerState, JobRef,
    Scheduler, parse_schedule,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

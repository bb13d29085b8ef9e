//! # Recurring jobs.
//!
//! - [`Job`] / [`JobFn`] - recurring unit of work
//! - [`Scheduler`] - engine seam (`schedule`, `remove`, `run`, `stop`, `entries`)
//! - [`CronScheduler`] - cron-expression engine on tokio tasks, evaluated in a [`CronTimezone`]
//! - [`JobManager`] - Idle/Started/Stopping state machine with rollback and drain

mod cron_scheduler;
mod job;
mod manager;
mod scheduler;

pub use cron_scheduler::{CronScheduler, CronTimezone, parse_schedule};
pub use job::{Job, JobFn, JobRef};
pub use manager::{JobManager, JobManagerState};
pub use scheduler::{DrainSignal, Entry, EntryId, Scheduler};

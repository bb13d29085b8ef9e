//! # Recurring job abstraction and function-backed job.
//!
//! A [`Job`] is a unit of recurring work: a recurrence expression plus a run
//! entry point. The caller owns the job; the [`JobManager`](crate::JobManager)
//! only orchestrates its scheduling.
//!
//! Executions are independent: two firings of the same job may overlap unless
//! the implementation serializes itself.
//!
//! ## Example
//! ```rust
//! use appvisor::{JobFn, JobRef, ComponentError};
//!
//! let cleanup: JobRef = JobFn::arc("cleanup", "0 */5 * * * *", || async {
//!     // delete expired sessions...
//!     Ok::<_, ComponentError>(())
//! });
//! assert_eq!(cleanup.schedule(), "0 */5 * * * *");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ComponentError;

/// Shared handle to a job.
pub type JobRef = Arc<dyn Job>;

/// # Recurring unit of work.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Returns a stable, human-readable job name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Recurrence expression, e.g. `"*/15 * * * *"` or `"0 0 3 * * *"`.
    fn schedule(&self) -> &str;

    /// Executes one firing of the job.
    async fn run(&self) -> Result<(), ComponentError>;
}

/// Function-backed job.
#[derive(Debug)]
pub struct JobFn<F> {
    name: Cow<'static, str>,
    schedule: Cow<'static, str>,
    f: F,
}

impl<F, Fut> JobFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    /// Creates a new function-backed job.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        schedule: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Self {
        Self {
            name: name.into(),
            schedule: schedule.into(),
            f,
        }
    }

    /// Creates the job and returns it as a shared handle.
    pub fn arc(
        name: impl Into<Cow<'static, str>>,
        schedule: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Arc<Self> {
        Arc::new(Self::new(name, schedule, f))
    }
}

#[async_trait]
impl<F, Fut> Job for JobFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn run(&self) -> Result<(), ComponentError> {
        (self.f)().await
    }
}

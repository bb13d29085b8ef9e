//! Error types used by the appvisor runtime, its components and jobs.
//!
//! This module defines the error enums:
//!
//! - [`ComponentError`]: errors raised by starters, closers and jobs.
//! - [`RuntimeError`]: errors raised by the supervisor itself (aggregated startup
//!   failures, shutdown failures, lifecycle misuse).
//! - [`JobError`]: errors raised by the [`JobManager`](crate::JobManager).
//! - [`ScheduleError`]: errors raised by a [`Scheduler`](crate::Scheduler) adapter.
//!
//! All types provide `as_label` for logs/metrics.

use std::fmt;

use thiserror::Error;

/// # Errors produced by components (starters, closers, jobs).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// The component failed.
    #[error("component failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The component observed cancellation (or its deadline) before finishing.
    ///
    /// For starters this counts as a graceful exit.
    #[error("context cancelled")]
    Canceled,

    /// The component panicked; the panic was caught by the runtime.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl ComponentError {
    /// Shorthand for [`ComponentError::Fail`].
    pub fn fail(error: impl fmt::Display) -> Self {
        ComponentError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::ComponentError;
    ///
    /// assert_eq!(ComponentError::fail("boom").as_label(), "component_failed");
    /// assert_eq!(ComponentError::Canceled.as_label(), "component_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ComponentError::Fail { .. } => "component_failed",
            ComponentError::Canceled => "component_canceled",
            ComponentError::Panicked { .. } => "component_panicked",
        }
    }

    /// Whether the error only reports cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, ComponentError::Canceled)
    }
}

impl From<JobError> for ComponentError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::DrainInterrupted => ComponentError::Canceled,
            other => ComponentError::fail(other),
        }
    }
}

/// A failure attributed to a named component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFailure {
    /// Component name as reported by `Starter::name` / `Closer::name`.
    pub component: String,
    /// What went wrong.
    pub error: ComponentError,
}

impl fmt::Display for ComponentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.error)
    }
}

/// # Errors produced by the supervisor.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// One or more starters failed. No failure is dropped.
    #[error("startup failed: {}", join(.failures))]
    Startup {
        /// Every failing starter, in the order its outcome was observed.
        failures: Vec<ComponentFailure>,
    },

    /// Closing components failed.
    ///
    /// With the fail-fast close policy this holds exactly one failure.
    #[error("shutdown failed: {}", join(.failures))]
    Shutdown {
        /// Every failing closer, in invocation order.
        failures: Vec<ComponentFailure>,
    },

    /// Operation is not valid in the current lifecycle state.
    #[error("cannot {op} supervisor in state {state}")]
    InvalidState {
        /// Rejected operation (`start` / `close`).
        op: &'static str,
        /// State observed at the time of the call.
        state: &'static str,
    },

    /// A typed component was requested but never provided.
    #[error("component `{type_name}` is not initialized or not required, please check your config")]
    ComponentMissing {
        /// Rust type name of the missing component.
        type_name: &'static str,
    },

    /// The orchestration body itself panicked; the panic was caught.
    #[error("panic in start: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::RuntimeError;
    ///
    /// let err = RuntimeError::Startup { failures: vec![] };
    /// assert_eq!(err.as_label(), "runtime_startup_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Startup { .. } => "runtime_startup_failed",
            RuntimeError::Shutdown { .. } => "runtime_shutdown_failed",
            RuntimeError::InvalidState { .. } => "runtime_invalid_state",
            RuntimeError::ComponentMissing { .. } => "runtime_component_missing",
            RuntimeError::Panicked { .. } => "runtime_panicked",
        }
    }

    /// Returns the component failures carried by this error (empty for other kinds).
    pub fn failures(&self) -> &[ComponentFailure] {
        match self {
            RuntimeError::Startup { failures } | RuntimeError::Shutdown { failures } => failures,
            _ => &[],
        }
    }
}

/// # Errors produced by the job manager.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Jobs can only be added while the manager is idle.
    #[error("cannot add job after manager has started")]
    AddAfterStart,

    /// `start` was called on a manager that is already started.
    #[error("job manager already started")]
    AlreadyStarted,

    /// The manager is draining after a timed-out close; retry `close` first.
    #[error("job manager is stopping")]
    Stopping,

    /// A job could not be scheduled; every entry scheduled in the same call was rolled back.
    #[error("failed to add job {job:?} with schedule {spec:?}: {error}")]
    Schedule {
        /// Job name.
        job: String,
        /// Offending recurrence expression.
        spec: String,
        /// Scheduler error message.
        error: String,
    },

    /// The close deadline fired before in-flight executions drained.
    #[error("close deadline reached before jobs drained")]
    DrainInterrupted,
}

impl JobError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::AddAfterStart => "job_add_after_start",
            JobError::AlreadyStarted => "job_already_started",
            JobError::Stopping => "job_manager_stopping",
            JobError::Schedule { .. } => "job_schedule_failed",
            JobError::DrainInterrupted => "job_drain_interrupted",
        }
    }
}

/// # Errors produced by a scheduler adapter.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The recurrence expression could not be parsed.
    #[error("invalid schedule {spec:?}: {error}")]
    Parse {
        /// Offending expression.
        spec: String,
        /// Parser message.
        error: String,
    },
}

fn join(failures: &[ComponentFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

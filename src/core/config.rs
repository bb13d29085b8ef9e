//! # Global runtime configuration.
//!
//! Provides [`SupervisorConfig`], centralized settings for the supervisor.
//! Loading it from files or environment belongs to the host application.
//!
//! ## Sentinel values
//! - `grace = 0s` → closers get no deadline
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::jobs::CronTimezone;

/// Order in which closers are invoked during shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownOrder {
    /// Registration order: the first registered closer runs first.
    #[default]
    Registration,
    /// Reverse registration order: the last registered closer runs first.
    Reverse,
}

/// What to do when a closer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClosePolicy {
    /// Stop at the first failing closer; later closers are not invoked.
    #[default]
    FailFast,
    /// Invoke every closer and aggregate the failures.
    BestEffort,
}

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `grace`: deadline handed to closers on signal-driven shutdown (`0s` = no deadline)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `shutdown_order`: closer invocation order
/// - `close_policy`: fail-fast or best-effort close
/// - `handle_signals`: install SIGINT/SIGTERM (Ctrl-C on Windows) listeners in `start`
/// - `cron_timezone`: zone for jobs registered with `Supervisor::add_jobs`
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time closers get during shutdown.
    ///
    /// When it runs out, the token passed to `Closer::close` is cancelled.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Order in which closers run.
    pub shutdown_order: ShutdownOrder,

    /// Behaviour when a closer fails.
    pub close_policy: ClosePolicy,

    /// Whether `start` listens for OS termination signals.
    ///
    /// When `false`, shutdown is triggered only by cancelling the token passed to
    /// `start`, by calling `close`, or by every starter exiting.
    pub handle_signals: bool,

    /// Zone cron expressions of `Supervisor::add_jobs` are evaluated in.
    pub cron_timezone: CronTimezone,
}

impl SupervisorConfig {
    /// Returns the close deadline as an `Option` (`None` when `grace` is zero).
    #[inline]
    pub fn close_deadline(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    /// - `shutdown_order = Registration`
    /// - `close_policy = FailFast`
    /// - `handle_signals = true`
    /// - `cron_timezone = Local`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            shutdown_order: ShutdownOrder::default(),
            close_policy: ClosePolicy::default(),
            handle_signals: true,
            cron_timezone: CronTimezone::Local,
        }
    }
}

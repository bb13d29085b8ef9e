//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//!
//! ## Example output
//! ```text
//! [starter-starting] component="http"
//! [starter-failed] component="grpc" err="bind: address in use"
//! [jobs-scheduled] count=3
//! [shutdown-requested] reason="signal"
//! [closer-closed] component="jobs"
//! [shutdown-completed]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn tag(kind: EventKind) -> &'static str {
    match kind {
        EventKind::SubscriberPanicked => "subscriber-panicked",
        EventKind::SubscriberOverflow => "subscriber-overflow",
        EventKind::ShutdownRequested => "shutdown-requested",
        EventKind::ShutdownCompleted => "shutdown-completed",
        EventKind::ShutdownFailed => "shutdown-failed",
        EventKind::SignalUnavailable => "signal-unavailable",
        EventKind::StartPanicked => "start-panicked",
        EventKind::StarterStarting => "starter-starting",
        EventKind::StarterStopped => "starter-stopped",
        EventKind::StarterFailed => "starter-failed",
        EventKind::CloserClosed => "closer-closed",
        EventKind::CloserFailed => "closer-failed",
        EventKind::JobsScheduled => "jobs-scheduled",
        EventKind::JobScheduleFailed => "job-schedule-failed",
        EventKind::JobsDrained => "jobs-drained",
        EventKind::JobFailed => "job-failed",
        EventKind::JobPanicked => "job-panicked",
    }
}

fn render(e: &Event) -> String {
    let mut line = format!("[{}]", tag(e.kind));
    if let Some(component) = &e.component {
        line.push_str(&format!(" component={component:?}"));
    }
    if let Some(count) = e.count {
        line.push_str(&format!(" count={count}"));
    }
    if let Some(reason) = &e.reason {
        let key = if e.is_failure() { "err" } else { "reason" };
        line.push_str(&format!(" {key}={reason:?}"));
    }
    line
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", render(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

//! # Event fan-out to subscriber workers.
//!
//! [`SubscriberSet`] owns one bounded queue and one worker task per
//! subscriber. `emit` hands the event to every queue with `try_send` and never
//! waits on a subscriber.
//!
//! ```text
//! emit(&event) ──Arc──┬──► lane "log"     ──► worker ──► on_event()
//!                     ├──► lane "metrics" ──► worker ──► on_event()
//!                     └──► lane "alerts"  ──► worker ──► on_event()
//!                                                  └─ panic ─► SubscriberPanicked
//! ```
//!
//! A full or closed lane drops the event for that subscriber only and publishes
//! `SubscriberOverflow` (overflow events themselves are never reported, so a
//! saturated subscriber cannot feed itself).
//!
//! Panics are caught with `AssertUnwindSafe`; a subscriber that panics while
//! holding a lock may leave its own state inconsistent.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::panic_info;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

struct Lane {
    subscriber: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Per-subscriber queues and their worker tasks.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (lanes, workers) = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let lane = Lane {
                    subscriber: sub.name(),
                    tx,
                };
                (lane, spawn_worker(sub, rx, bus.clone()))
            })
            .unzip();

        Self {
            lanes,
            workers,
            bus,
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Whether there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Queues `event` for every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for lane in &self.lanes {
            let reason = match lane.tx.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if shared.kind != EventKind::SubscriberOverflow {
                self.bus
                    .publish(Event::subscriber_overflow(lane.subscriber, reason));
            }
        }
    }

    /// Closes every lane and waits until the workers have handled what was queued.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

fn spawn_worker(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    bus: Bus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            if let Err(panic_err) = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await {
                bus.publish(Event::subscriber_panicked(sub.name(), panic_info(&*panic_err)));
            }
        }
    })
}

//! # Broadcast bus for runtime events.
//!
//! Every publisher (the supervisor, starter tasks, the job manager, the cron
//! scheduler, subscriber workers) holds a clone of the same [`Bus`]. The
//! supervisor's listener is the main receiver; tests and hosts may subscribe
//! directly.
//!
//! ```text
//! Supervisor    ──┐
//! JobManager    ──┼──► Bus ──► subscriber_listener ──► SubscriberSet
//! CronScheduler ──┘     └────► bus.subscribe() (tests, host code)
//! ```
//!
//! `publish` never blocks. The channel is a bounded ring shared by all
//! receivers: a receiver that falls behind gets `Lagged(n)` and loses the `n`
//! oldest events. Events published with no receiver are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Shared handle to the event channel; clones publish into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Sends `ev` to every current receiver.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_publish_reaches_every_receiver() {
        let bus = Bus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(Event::new(EventKind::ShutdownRequested));

        assert_eq!(a.recv().await.unwrap().kind, EventKind::ShutdownRequested);
        assert_eq!(b.recv().await.unwrap().kind, EventKind::ShutdownRequested);
    }

    #[test]
    fn test_publish_without_receivers_is_noop() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ShutdownCompleted));
    }
}

use std::sync::Arc;

use crate::{
    core::SupervisorConfig,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

use super::supervisor::Supervisor;

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (starter and closer outcomes, job
    /// failures, shutdown progress) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor.
    ///
    /// Creates the event bus, spawns the subscriber workers and the listener
    /// forwarding bus events to them. Must be called inside a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        let sup = Arc::new(Supervisor::new_internal(self.cfg, bus, subs));
        sup.subscriber_listener();
        sup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventKind};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.kinds.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_built_supervisor_forwards_bus_events() {
        let rec = Arc::new(Recorder::default());
        let sup = SupervisorBuilder::new(SupervisorConfig {
            bus_capacity: 0,
            ..SupervisorConfig::default()
        })
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .build();

        sup.bus().publish(Event::new(EventKind::JobsScheduled).with_count(2));

        for _ in 0..50 {
            if !rec.kinds.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*rec.kinds.lock().unwrap(), vec![EventKind::JobsScheduled]);
    }
}

//! # Event subscriber trait.
//!
//! Provides [`Subscribe`], the extension point for plugging log writers,
//! metrics exporters or alerting into the supervisor.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `EventKind::SubscriberPanicked`)
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use appvisor::{Subscribe, Event, EventKind};
//!
//! struct Alerts;
//!
//! #[async_trait]
//! impl Subscribe for Alerts {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::StarterFailed | EventKind::ShutdownFailed) {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "alerts" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receives every runtime event on its own worker task.
///
/// `on_event` should stay async and cheap: a slow subscriber only fills its
/// own queue, and events it cannot keep up with are dropped for it alone.
/// A panic is caught and turned into a `SubscriberPanicked` event.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event; events arrive in publish order.
    async fn on_event(&self, event: &Event);

    /// Name reported in overflow and panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue; values below 1 are raised to 1.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

//! # Event subscribers for the appvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and, behind the `logging` feature, the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Supervisor / JobManager / CronScheduler ── publish(Event) ──► Bus
//!                                                                │
//!                                                  subscriber_listener
//!                                                                │
//!                                                         SubscriberSet
//!                                                   ┌────────────┼────────────┐
//!                                                   ▼            ▼            ▼
//!                                               LogWriter     Metrics      Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;

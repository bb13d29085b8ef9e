//! Runtime core: orchestration and lifecycle.
//!
//! The public API from this module is [`Supervisor`] with its builder and
//! configuration; the rest supports it.
//!
//! Internal modules:
//! - [`supervisor`]: runs starters, coordinates shutdown, runs closers;
//! - [`builder`]: wires the bus and subscriber workers into a supervisor;
//! - [`registry`]: ordered, append-only component registries;
//! - [`component_map`]: typed component accessors;
//! - [`shutdown`]: cross-platform signal handling and close deadlines;
//! - [`config`]: runtime settings.

mod builder;
mod component_map;
mod config;
mod registry;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use component_map::ComponentMap;
pub use config::{ClosePolicy, ShutdownOrder, SupervisorConfig};
pub(crate) use registry::lock;
pub use registry::Registry;
pub use supervisor::{Supervisor, SupervisorState};

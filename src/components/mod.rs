//! # Component capabilities.
//!
//! Subsystems are opaque to the supervisor; it only sees two capabilities:
//! - [`Starter`] - blocking, cancellable run operation ([`StarterFn`] for closures)
//! - [`Closer`] - resource release during shutdown ([`CloserFn`] for closures)

mod closer;
mod starter;

pub use closer::{Closer, CloserFn, CloserRef};
pub use starter::{Starter, StarterFn, StarterRef};

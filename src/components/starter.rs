//! # Starter capability and function-backed starter.
//!
//! A [`Starter`] is a subsystem with a blocking, cancellable `start`: an HTTP
//! listener, an RPC server, a broker subscriber, a metrics exporter. The
//! supervisor runs every registered starter on its own task and passes it a
//! [`CancellationToken`] that fires on shutdown.
//!
//! ## Contract
//! - `start` blocks until the token is cancelled (return `Ok(())`) or an
//!   unrecoverable condition occurs (return `Err`).
//! - Returning `Err(ComponentError::Canceled)` is treated as a graceful exit.
//! - Starters are independent of each other; no ordering between them.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use appvisor::{StarterFn, StarterRef, ComponentError};
//!
//! let http: StarterRef = StarterFn::arc("http", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Ok::<_, ComponentError>(())
//! });
//! assert_eq!(http.name(), "http");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::components::CloserRef;
use crate::error::ComponentError;

/// Shared handle to a starter.
pub type StarterRef = Arc<dyn Starter>;

/// # Blocking, cancellable run operation.
#[async_trait]
pub trait Starter: Send + Sync + 'static {
    /// Returns a stable, human-readable name used in events and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs until `ctx` is cancelled or the component fails.
    async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError>;

    /// Returns this starter as a closer when it also releases resources on shutdown.
    ///
    /// [`Supervisor::add_parallel`](crate::Supervisor::add_parallel) registers the
    /// returned closer automatically. Default: `None`.
    fn closer(self: Arc<Self>) -> Option<CloserRef> {
        None
    }
}

/// Function-backed starter.
///
/// Wraps a closure that creates a new future per `start` call.
#[derive(Debug)]
pub struct StarterFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> StarterFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    /// Creates a new function-backed starter.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the starter and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Starter for StarterFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        (self.f)(ctx).await
    }
}

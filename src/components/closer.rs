//! # Closer capability and function-backed closer.
//!
//! A [`Closer`] releases resources during shutdown: flushes a publisher,
//! closes a connection pool, drains a job scheduler. Closers run sequentially
//! in the supervisor's configured order, never concurrently.
//!
//! The [`CancellationToken`] passed to `close` is the close deadline: it fires
//! when the supervisor's grace period runs out.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ComponentError;

/// Shared handle to a closer.
pub type CloserRef = Arc<dyn Closer>;

/// # Resource-release operation.
///
/// Must be safe to call without a prior `start` (no-op or graceful).
#[async_trait]
pub trait Closer: Send + Sync + 'static {
    /// Returns a stable, human-readable name used in events and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Releases resources; should return before `ctx` is cancelled.
    async fn close(&self, ctx: CancellationToken) -> Result<(), ComponentError>;
}

/// Function-backed closer.
#[derive(Debug)]
pub struct CloserFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> CloserFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    /// Creates a new function-backed closer.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the closer and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Closer for CloserFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn close(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        (self.f)(ctx).await
    }
}

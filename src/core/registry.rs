//! # Component registries.
//!
//! [`Registry`] is the append-only, insertion-ordered list behind the
//! supervisor's starters and closers.
//!
//! ## Rules
//! - Writes happen during initialization (many `add` calls, possibly from
//!   different tasks); the single read happens from `start`/`close`.
//! - `add` never rejects.
//! - `snapshot` clones the list so iteration never holds the lock across `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Append-only, thread-safe, insertion-ordered collection.
pub struct Registry<T> {
    items: Mutex<Vec<T>>,
}

impl<T: Clone> Registry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Appends an item.
    pub fn add(&self, item: T) {
        lock(&self.items).push(item);
    }

    /// Returns the items in registration order.
    pub fn snapshot(&self) -> Vec<T> {
        lock(&self.items).clone()
    }

    /// Number of registered items.
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }
}

impl<T: Clone> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

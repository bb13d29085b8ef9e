//! # Typed component accessors.
//!
//! The supervisor keeps a reference to every subsystem the host exposes to
//! request handlers (database pool, cache client, publisher, job manager).
//! Components are keyed by type; asking for one that was never provided is a
//! configuration error.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core::lock;
use crate::error::RuntimeError;

type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-keyed map of shared components.
#[derive(Default)]
pub struct ComponentMap {
    items: Mutex<HashMap<TypeId, AnyArc>>,
}

impl ComponentMap {
    /// Stores `component`, replacing a previous one of the same type.
    pub fn insert<T: Any + Send + Sync>(&self, component: Arc<T>) {
        lock(&self.items).insert(TypeId::of::<T>(), component);
    }

    /// Returns the component of type `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, RuntimeError> {
        lock(&self.items)
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|c| c.downcast::<T>().ok())
            .ok_or(RuntimeError::ComponentMissing {
                type_name: type_name::<T>(),
            })
    }

    /// Whether a component of type `T` was provided.
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        lock(&self.items).contains_key(&TypeId::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Postgres {
        dsn: &'static str,
    }

    #[derive(Debug)]
    struct Redis;

    #[test]
    fn test_get_returns_provided_component() {
        let map = ComponentMap::default();
        map.insert(Arc::new(Postgres { dsn: "postgres://db" }));

        assert!(map.contains::<Postgres>());
        assert_eq!(map.get::<Postgres>().unwrap().dsn, "postgres://db");
    }

    #[test]
    fn test_missing_component_names_the_type() {
        let map = ComponentMap::default();
        let err = map.get::<Redis>().unwrap_err();
        assert!(matches!(err, RuntimeError::ComponentMissing { type_name } if type_name.ends_with("Redis")));
    }
}

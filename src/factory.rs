//! By-name construction of scope nodes.
//!
//! Prototype-instancing code (deserializers, action-creation queues) knows
//! types only by name. [`ScopeFactory`] maps a name to a constructor that
//! spawns a populated node in a heap; unregistered names are a lookup error,
//! not a panic.

use rustc_hash::FxHashMap;

use crate::error::{FactoryError, ScopekitError};
use crate::heap::{ScopeHeap, ScopeId};
use crate::registry::TypeRegistry;

/// Constructor for one registered type: spawns a default instance into the
/// heap and returns its handle.
pub type FactoryFn = fn(&mut ScopeHeap, &TypeRegistry) -> Result<ScopeId, ScopekitError>;

/// Registry mapping type names to constructors.
#[derive(Debug, Default)]
pub struct ScopeFactory {
    makers: FxHashMap<String, FactoryFn>,
}

impl ScopeFactory {
    /// Create a new empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`. Duplicate names are an error.
    pub fn register(&mut self, name: &str, maker: FactoryFn) -> Result<(), FactoryError> {
        if self.makers.contains_key(name) {
            return Err(FactoryError::DuplicateFactory {
                name: name.to_string(),
            });
        }
        log::debug!("registered factory {name:?}");
        self.makers.insert(name.to_string(), maker);
        Ok(())
    }

    /// Construct an instance of the type registered under `name`.
    pub fn create(
        &self,
        name: &str,
        heap: &mut ScopeHeap,
        registry: &TypeRegistry,
    ) -> Result<ScopeId, ScopekitError> {
        let maker = self.makers.get(name).ok_or_else(|| {
            ScopekitError::Factory(FactoryError::UnknownFactory {
                name: name.to_string(),
            })
        })?;
        maker(heap, registry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.makers.contains_key(name)
    }

    /// Drop a registration. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.makers.remove(name).is_some()
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.makers.clear();
    }

    pub fn len(&self) -> usize {
        self.makers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.makers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    fn make_scope(heap: &mut ScopeHeap, _registry: &TypeRegistry) -> Result<ScopeId, ScopekitError> {
        Ok(heap.insert(Scope::new()))
    }

    #[test]
    fn create_by_name() {
        let mut factory = ScopeFactory::new();
        factory.register("Scope", make_scope).unwrap();
        assert!(factory.contains("Scope"));

        let mut heap = ScopeHeap::new();
        let registry = TypeRegistry::new();
        let id = factory.create("Scope", &mut heap, &registry).unwrap();
        assert!(heap.contains(id));
    }

    #[test]
    fn unknown_name_is_an_error() {
        let factory = ScopeFactory::new();
        let mut heap = ScopeHeap::new();
        let registry = TypeRegistry::new();
        assert!(matches!(
            factory.create("Ghost", &mut heap, &registry),
            Err(ScopekitError::Factory(FactoryError::UnknownFactory { .. }))
        ));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut factory = ScopeFactory::new();
        factory.register("Scope", make_scope).unwrap();
        assert_eq!(
            factory.register("Scope", make_scope).unwrap_err(),
            FactoryError::DuplicateFactory {
                name: String::from("Scope")
            }
        );
    }

    #[test]
    fn remove_and_clear() {
        let mut factory = ScopeFactory::new();
        factory.register("Scope", make_scope).unwrap();
        assert!(factory.remove("Scope"));
        assert!(!factory.remove("Scope"));
        factory.register("Scope", make_scope).unwrap();
        factory.clear();
        assert!(factory.is_empty());
    }
}
